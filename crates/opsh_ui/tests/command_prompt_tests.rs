use std::rc::Rc;
use std::time::Duration;

use opsh_core::{Candidate, CommandDefinition, CompletionEngine, OptionDef, Registry};
use opsh_ui::{CommandPrompt, History, ScriptedKeys, Session, Terminal, UiConfig, UiError};

fn registry() -> Rc<Registry> {
    let widgets = CommandDefinition::new("widgets", "Manage widgets")
        .subcommand(CommandDefinition::new("list", "List widgets").execute(|_| async { Ok(()) }))
        .subcommand(CommandDefinition::new("download", "Download a widget").execute(|_| async { Ok(()) }));
    let themes = CommandDefinition::new("themes", "Manage themes").subcommand(
        CommandDefinition::new("download", "Download a theme")
            .option(OptionDef::new("site").candidates(|_line| async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(vec![Candidate::new("siteUS"), Candidate::new("siteEU")])
            }))
            .option(
                OptionDef::new("mirror")
                    .candidates(|_line| async { Err(anyhow::anyhow!("mirror list unavailable")) }),
            )
            .execute(|_| async { Ok(()) }),
    );

    let mut registry = Registry::new();
    registry.register(widgets).unwrap();
    registry.register(themes).unwrap();
    Rc::new(registry)
}

fn config() -> UiConfig {
    UiConfig {
        busy_debounce_ms: 5,
        blink_ms: 1,
        ..UiConfig::default()
    }
}

fn setup(keys: ScriptedKeys) -> (CommandPrompt, Session, opsh_ui::Capture) {
    let config = config();
    let (term, out) = Terminal::scripted(keys);
    let prompt = CommandPrompt::new(CompletionEngine::new(registry()), &config);
    let session = Session::new(term, History::in_memory(config.history_limit), config);
    (prompt, session, out)
}

#[tokio::test]
async fn tab_completes_single_candidate() {
    let keys = ScriptedKeys::default().text("wid").then(["tab", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets ");
    assert_eq!(session.keymaps.depth(), 0);
}

#[tokio::test]
async fn picker_selection_is_inserted() {
    // Candidates are sorted: download, list.
    let keys = ScriptedKeys::default()
        .text("widgets ")
        .then(["tab", "down", "return", "return"]);
    let (prompt, mut session, out) = setup(keys);
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets list ");
    assert!(out.contents().contains("0 download"));
}

#[tokio::test]
async fn escaped_key_goes_back_to_the_line() {
    let keys = ScriptedKeys::default().text("widgets ").then(["tab", "x", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets x");
}

#[tokio::test]
async fn escape_closes_picker_without_change() {
    let keys = ScriptedKeys::default().text("widgets ").then(["tab", "escape", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets ");
}

#[tokio::test]
async fn slow_provider_shows_busy_marker() {
    let keys = ScriptedKeys::default()
        .text("themes download --site ")
        .then(["tab", "return", "return"]);
    let (prompt, mut session, out) = setup(keys);
    assert_eq!(
        prompt.read(&mut session).await.unwrap(),
        "themes download --site siteEU "
    );
    assert!(out.contents().contains('…'));
}

#[tokio::test]
async fn provider_failure_is_shown_and_editing_continues() {
    let keys = ScriptedKeys::default()
        .text("themes download --mirror ")
        .then(["tab"])
        .text("m1")
        .then(["return"]);
    let (prompt, mut session, out) = setup(keys);
    assert_eq!(
        prompt.read(&mut session).await.unwrap(),
        "themes download --mirror m1"
    );
    assert!(out.contents().contains("mirror list unavailable"));
}

#[tokio::test]
async fn blank_submit_blinks_and_keeps_reading() {
    let keys = ScriptedKeys::default().then(["return", "a", "return"]);
    let (prompt, mut session, out) = setup(keys);
    assert_eq!(prompt.read(&mut session).await.unwrap(), "a");
    assert!(out.contents().contains("\u{1b}[7m"));
}

#[tokio::test]
async fn history_recall_and_draft_restore() {
    let keys = ScriptedKeys::default()
        .text("dr")
        .then(["up", "up", "down", "down", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    session.history.push("widgets list");
    session.history.push("themes download dark");
    assert_eq!(prompt.read(&mut session).await.unwrap(), "dr");
}

#[tokio::test]
async fn history_recall_submits_entry() {
    let keys = ScriptedKeys::default().then(["up", "up", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    session.history.push("widgets list");
    session.history.push("themes download dark");
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets list");
}

#[tokio::test]
async fn typing_resets_history_scroll() {
    let keys = ScriptedKeys::default()
        .then(["up"])
        .text("x")
        .then(["up", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    session.history.push("widgets list");
    session.history.push("themes download dark");
    // Without the reset the second `up` would reach the older entry.
    assert_eq!(prompt.read(&mut session).await.unwrap(), "themes download dark");
    assert_eq!(session.history.scroll_index(), Some(0));
}

#[tokio::test]
async fn suggestion_is_accepted_with_right_arrow() {
    let keys = ScriptedKeys::default().text("wid").then(["right", "return"]);
    let (prompt, mut session, _out) = setup(keys);
    session.history.push("widgets download w-100");
    assert_eq!(prompt.read(&mut session).await.unwrap(), "widgets download w-100");
}

#[tokio::test]
async fn ctrl_c_interrupts() {
    let keys = ScriptedKeys::default().text("widg").then(["ctrl+c"]);
    let (prompt, mut session, _out) = setup(keys);
    assert!(matches!(prompt.read(&mut session).await, Err(UiError::Interrupted)));
    assert_eq!(session.keymaps.depth(), 0);
}

#[tokio::test]
async fn ctrl_d_on_empty_line_closes_input() {
    let keys = ScriptedKeys::default().text("a").then(["ctrl+a", "ctrl+d", "ctrl+d"]);
    let (prompt, mut session, _out) = setup(keys);
    assert!(matches!(prompt.read(&mut session).await, Err(UiError::InputClosed)));
}
