//! Demo command catalog over an in-memory store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{bail, Context};
use opsh_core::{ArgumentDef, Candidate, CommandDefinition, OptionDef, Registry, RegistryError};
use opsh_ui::{Asker, Prompt};

#[derive(Debug, Clone)]
struct Site {
    id: &'static str,
    region: &'static str,
}

#[derive(Debug)]
pub struct Store {
    sites: Vec<Site>,
    widgets: BTreeMap<String, String>,
    themes: Vec<String>,
    /// (what, site) pairs
    installed: Vec<(String, String)>,
    current_site: Option<String>,
    user: Option<String>,
}

impl Default for Store {
    fn default() -> Self {
        let widgets = [
            ("w-100", "Clock"),
            ("w-200", "Weather"),
            ("w-300", "Stock ticker"),
        ];
        Self {
            sites: vec![
                Site { id: "siteUS", region: "United States" },
                Site { id: "siteEU", region: "Europe" },
                Site { id: "siteAP", region: "Asia Pacific" },
            ],
            widgets: widgets
                .into_iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            themes: vec!["Dark Mode".to_string(), "Light".to_string(), "Solarized".to_string()],
            installed: Vec::new(),
            current_site: None,
            user: None,
        }
    }
}

impl Store {
    fn site_candidates(&self) -> Vec<Candidate> {
        self.sites
            .iter()
            .map(|s| Candidate::new(s.id).with_description(s.region))
            .collect()
    }

    fn has_site(&self, id: &str) -> bool {
        self.sites.iter().any(|s| s.id == id)
    }

    /// Explicit `--site`, else the selected site.
    fn target_site(&self, explicit: Option<&str>) -> anyhow::Result<String> {
        match explicit.or(self.current_site.as_deref()) {
            Some(site) => Ok(site.to_string()),
            None => bail!("no site given; pass --site or run `sites use`"),
        }
    }
}

pub type SharedStore = Rc<RefCell<Store>>;

/// Register the demo commands. `asker` is used by commands that prompt.
pub fn build(store: SharedStore, asker: Asker) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry.register(sites(&store, &asker))?;
    registry.register(widgets(&store, &asker))?;
    registry.register(themes(&store, &asker))?;
    registry.register(login(&store, &asker))?;
    registry.register(logout(&store, &asker))?;
    Ok(registry)
}

fn site_option(store: &SharedStore) -> OptionDef {
    let provider_store = store.clone();
    let validator_store = store.clone();
    OptionDef::new("site")
        .short('s')
        .describe("Target site")
        .candidates(move |_line| {
            let sites = provider_store.borrow().site_candidates();
            async move { Ok(sites) }
        })
        .validate(move |value| {
            if validator_store.borrow().has_site(value) {
                Ok(())
            } else {
                bail!("unknown site `{value}`")
            }
        })
}

fn sites(store: &SharedStore, asker: &Asker) -> CommandDefinition {
    let list = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("list", "List sites").execute(move |_| {
            let (store, asker) = (store.clone(), asker.clone());
            async move {
                let store = store.borrow();
                for site in &store.sites {
                    let marker = if store.current_site.as_deref() == Some(site.id) { "*" } else { " " };
                    asker
                        .terminal()
                        .write_line(&format!("{marker} {:<8} {}", site.id, site.region))?;
                }
                Ok(())
            }
        })
    };

    let choose = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("use", "Select the default site").execute(move |_| {
            let (store, asker) = (store.clone(), asker.clone());
            async move {
                let candidates = store.borrow().site_candidates();
                if let Some(site) = asker.choose("Select a site:", candidates).await? {
                    asker.terminal().write_line(&format!("using {}", site.value))?;
                    store.borrow_mut().current_site = Some(site.value);
                }
                Ok(())
            }
        })
    };

    CommandDefinition::new("sites", "Show and select sites")
        .subcommand(list)
        .subcommand(choose)
}

fn widgets(store: &SharedStore, asker: &Asker) -> CommandDefinition {
    let id_argument = || {
        let store = store.clone();
        ArgumentDef::new("id")
            .describe("Widget id")
            .candidates(move |_line| {
                let ids = store
                    .borrow()
                    .widgets
                    .iter()
                    .map(|(id, name)| Candidate::new(id).with_description(name))
                    .collect();
                async move { Ok(ids) }
            })
    };

    let list = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("list", "List widgets").execute(move |_| {
            let (store, asker) = (store.clone(), asker.clone());
            async move {
                for (id, name) in &store.borrow().widgets {
                    asker.terminal().write_line(&format!("{id:<8} {name}"))?;
                }
                Ok(())
            }
        })
    };

    let download = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("download", "Install a widget on a site")
            .argument(id_argument())
            .option(site_option(&store))
            .option(OptionDef::flag("dry-run").describe("Show what would happen"))
            .execute(move |inv| {
                let (store, asker) = (store.clone(), asker.clone());
                async move {
                    let id = inv.arg(0).context("missing widget id")?.to_string();
                    if !store.borrow().widgets.contains_key(&id) {
                        bail!("no widget `{id}`");
                    }
                    let site = store.borrow().target_site(inv.value("site"))?;
                    if inv.flag("dryRun") {
                        asker.terminal().write_line(&format!("would install {id} on {site}"))?;
                        return Ok(());
                    }
                    store.borrow_mut().installed.push((id.clone(), site.clone()));
                    asker.terminal().write_line(&format!("installed {id} on {site}"))?;
                    Ok(())
                }
            })
    };

    let remove = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("remove", "Delete a widget")
            .argument(id_argument())
            .option(OptionDef::flag("force").short('f').describe("Do not ask"))
            .execute(move |inv| {
                let (store, asker) = (store.clone(), asker.clone());
                async move {
                    let id = inv.arg(0).context("missing widget id")?.to_string();
                    if !store.borrow().widgets.contains_key(&id) {
                        bail!("no widget `{id}`");
                    }
                    if !inv.flag("force") && !asker.confirm(&format!("Remove {id}?"), false).await? {
                        return Ok(());
                    }
                    store.borrow_mut().widgets.remove(&id);
                    asker.terminal().write_line(&format!("removed {id}"))?;
                    Ok(())
                }
            })
    };

    CommandDefinition::new("widgets", "Manage widgets")
        .long_description("Widgets are installed per site. Select a default site with `sites use`.")
        .subcommand(list)
        .subcommand(download)
        .subcommand(remove)
}

fn themes(store: &SharedStore, asker: &Asker) -> CommandDefinition {
    let name_store = store.clone();
    let name = ArgumentDef::new("name")
        .describe("Theme name")
        .candidates(move |_line| {
            let names = name_store.borrow().themes.iter().map(Candidate::new).collect();
            async move { Ok(names) }
        })
        .validate(|value| {
            if value.contains('/') {
                bail!("theme names cannot contain `/`");
            }
            Ok(())
        });

    let download = {
        let (store, asker) = (store.clone(), asker.clone());
        CommandDefinition::new("download", "Install a theme on a site")
            .argument(name)
            .option(site_option(&store))
            .execute(move |inv| {
                let (store, asker) = (store.clone(), asker.clone());
                async move {
                    let name = inv.arg(0).context("missing theme name")?.to_string();
                    if !store.borrow().themes.contains(&name) {
                        bail!("no theme `{name}`");
                    }
                    let site = store.borrow().target_site(inv.value("site"))?;
                    store.borrow_mut().installed.push((name.clone(), site.clone()));
                    asker.terminal().write_line(&format!("installed theme {name} on {site}"))?;
                    Ok(())
                }
            })
    };

    CommandDefinition::new("themes", "Manage themes").subcommand(download)
}

fn login(store: &SharedStore, asker: &Asker) -> CommandDefinition {
    let (store, asker) = (store.clone(), asker.clone());
    CommandDefinition::new("login", "Sign in").execute(move |_| {
        let (store, asker) = (store.clone(), asker.clone());
        async move {
            let user_prompt = Prompt::new("User: ").validate(|value| {
                if value.trim().is_empty() {
                    bail!("user name is required");
                }
                Ok(())
            });
            let user = asker.ask(&user_prompt).await?;
            let password = asker.secret("Password: ").await?;
            if password.is_empty() {
                bail!("empty password");
            }
            asker.terminal().write_line(&format!("signed in as {user}"))?;
            store.borrow_mut().user = Some(user);
            Ok(())
        }
    })
}

fn logout(store: &SharedStore, asker: &Asker) -> CommandDefinition {
    let signed_out = store.clone();
    let (store, asker) = (store.clone(), asker.clone());
    CommandDefinition::new("logout", "Sign out")
        .disabled_when(move || signed_out.borrow().user.is_none())
        .execute(move |_| {
            let (store, asker) = (store.clone(), asker.clone());
            async move {
                if let Some(user) = store.borrow_mut().user.take() {
                    asker.terminal().write_line(&format!("signed out {user}"))?;
                }
                Ok(())
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use opsh_core::{CompletionEngine, Dispatcher};
    use opsh_ui::{ScriptedKeys, Session, Terminal, UiConfig};

    fn setup(keys: ScriptedKeys) -> (Dispatcher, SharedStore, opsh_ui::Capture) {
        let (term, out) = Terminal::scripted(keys);
        let session = Session::new(term, Default::default(), UiConfig::default());
        let store = SharedStore::default();
        let registry = build(store.clone(), session.asker()).unwrap();
        (Dispatcher::new(Rc::new(registry)), store, out)
    }

    #[test]
    fn test_download_uses_selected_site() {
        let (d, store, out) = setup(ScriptedKeys::default());
        let runs = block_on(d.run_line("widgets download w-100"));
        assert!(!runs[0].succeeded());

        store.borrow_mut().current_site = Some("siteEU".into());
        let runs = block_on(d.run_line("widgets download w-100 && widgets download w-200 -s siteUS"));
        assert!(runs.iter().all(|r| r.succeeded()));
        assert_eq!(
            store.borrow().installed,
            vec![
                ("w-100".to_string(), "siteEU".to_string()),
                ("w-200".to_string(), "siteUS".to_string())
            ]
        );
        assert!(out.contents().contains("installed w-200 on siteUS"));
    }

    #[test]
    fn test_site_option_is_validated() {
        let (d, store, _out) = setup(ScriptedKeys::default());
        let runs = block_on(d.run_line("themes download Light --site mars"));
        assert!(!runs[0].succeeded());
        assert!(store.borrow().installed.is_empty());
    }

    #[test]
    fn test_quoted_theme_name() {
        let (d, store, _out) = setup(ScriptedKeys::default());
        let runs = block_on(d.run_line("themes download \"Dark Mode\" --site siteAP"));
        assert!(runs[0].succeeded());
        assert_eq!(store.borrow().installed[0].0, "Dark Mode");
    }

    #[test]
    fn test_logout_is_disabled_until_login() {
        let keys = ScriptedKeys::default()
            .text("ada")
            .then(["return"])
            .text("pw")
            .then(["return"]);
        let (d, store, out) = setup(keys);
        let engine = CompletionEngine::new(d.registry().clone());

        let top: Vec<String> = block_on(engine.complete("log")).unwrap().into_iter().map(|c| c.value).collect();
        assert_eq!(top, vec!["login"]);

        let runs = block_on(d.run_line("login"));
        assert!(runs[0].succeeded());
        assert_eq!(store.borrow().user.as_deref(), Some("ada"));
        assert!(out.contents().contains("Password: **"));

        let runs = block_on(d.run_line("logout"));
        assert!(runs[0].succeeded());
        assert!(store.borrow().user.is_none());
    }

    #[test]
    fn test_remove_asks_unless_forced() {
        let (d, store, _out) = setup(ScriptedKeys::chords(["n", "y"]));
        block_on(d.run_line("widgets remove w-100"));
        assert!(store.borrow().widgets.contains_key("w-100"));
        block_on(d.run_line("widgets remove w-100"));
        assert!(!store.borrow().widgets.contains_key("w-100"));
        block_on(d.run_line("widgets remove w-200 --force"));
        assert!(!store.borrow().widgets.contains_key("w-200"));
    }
}
