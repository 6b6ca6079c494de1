//! End-to-end checks of registry, dispatch and completion working together.

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use opsh_core::{
    ArgumentDef, Candidate, CommandDefinition, CompletionEngine, Dispatcher, Invocation,
    OptionDef, Outcome, Registry, RegistryError, ResolveError,
};

type Log = Rc<RefCell<Vec<Invocation>>>;

fn catalog(log: &Log) -> Registry {
    let download_log = log.clone();
    let themes_log = log.clone();

    let widgets = CommandDefinition::new("widgets", "Manage widgets")
        .subcommand(CommandDefinition::new("list", "List widgets").execute(|_| async { Ok(()) }))
        .subcommand(
            CommandDefinition::new("download", "Download a widget")
                .argument(ArgumentDef::new("id").choices(["w-100", "w-200"]))
                .execute(move |inv| {
                    let log = download_log.clone();
                    async move {
                        log.borrow_mut().push(inv);
                        Ok(())
                    }
                }),
        );

    let themes = CommandDefinition::new("themes", "Manage themes").subcommand(
        CommandDefinition::new("download", "Download a theme")
            .argument(ArgumentDef::new("name"))
            .option(
                OptionDef::new("site")
                    .describe("Site to install to")
                    .candidates(|_line| async {
                        Ok(vec![
                            Candidate::new("siteUS").with_description("United States"),
                            Candidate::new("siteEU").with_description("Europe"),
                        ])
                    }),
            )
            .execute(move |inv| {
                let log = themes_log.clone();
                async move {
                    log.borrow_mut().push(inv);
                    Ok(())
                }
            }),
    );

    let mut registry = Registry::new();
    registry.register(widgets).unwrap();
    registry.register(themes).unwrap();
    registry
}

#[test]
fn completing_partial_subcommand() {
    let log = Log::default();
    let engine = CompletionEngine::new(Rc::new(catalog(&log)));
    let candidates = block_on(engine.complete("widgets li")).unwrap();
    assert_eq!(candidates, vec![Candidate::new("list").with_description("List widgets")]);
}

#[test]
fn resolving_takes_longest_registered_prefix() {
    let log = Log::default();
    let registry = catalog(&log);
    let resolution = registry.resolve(&["widgets", "download", "abc"]).unwrap();
    assert_eq!(resolution.depth, 2);
    assert_eq!(resolution.id, "widgets:download");

    let dispatcher = Dispatcher::new(Rc::new(registry));
    let runs = block_on(dispatcher.run_line("widgets download abc"));
    assert!(matches!(
        &runs[0].result,
        Ok(Outcome::Executed { id }) if id == "widgets:download"
    ));
    assert_eq!(log.borrow()[0].positional, vec!["abc"]);
}

#[test]
fn chained_line_runs_both_contexts() {
    let log = Log::default();
    let dispatcher = Dispatcher::new(Rc::new(catalog(&log)));
    let runs = block_on(dispatcher.run_line("themes download dark --site siteUS && widgets list"));
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.succeeded()));
    assert_eq!(runs[0].text, "themes download dark --site siteUS");
    assert_eq!(log.borrow()[0].value("site"), Some("siteUS"));
}

#[test]
fn option_value_candidates_carry_descriptions() {
    let log = Log::default();
    let engine = CompletionEngine::new(Rc::new(catalog(&log)));
    let candidates = block_on(engine.complete("themes download dark --site siteE")).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].description.as_deref(), Some("Europe"));
}

#[test]
fn disabled_subtree_is_registered_but_unreachable() {
    let enabled = Rc::new(std::cell::Cell::new(false));
    let flag = enabled.clone();
    let def = CommandDefinition::new("admin", "Administration")
        .disabled_when(move || !flag.get())
        .subcommand(CommandDefinition::new("purge", "Purge caches").execute(|_| async { Ok(()) }));

    let mut registry = Registry::new();
    registry.register(def).unwrap();
    assert!(registry.contains("admin:purge"));

    let registry = Rc::new(registry);
    let dispatcher = Dispatcher::new(registry.clone());
    let engine = CompletionEngine::new(registry.clone());

    let runs = block_on(dispatcher.run_line("admin purge"));
    assert!(matches!(
        &runs[0].result,
        Err(opsh_core::DispatchError::Resolve(ResolveError::Disabled { .. }))
    ));
    assert!(block_on(engine.complete("")).unwrap().is_empty());

    enabled.set(true);
    assert!(block_on(dispatcher.run_line("admin purge"))[0].succeeded());
    assert_eq!(block_on(engine.complete("")).unwrap().len(), 1);
}

#[test]
fn duplicate_registration_is_rejected() {
    let log = Log::default();
    let mut registry = catalog(&log);
    let err = registry
        .register(CommandDefinition::new("themes", "again"))
        .unwrap_err();
    assert_eq!(err, RegistryError::Duplicate { id: "themes".into() });
    assert!(err.to_string().contains("themes"));
}
