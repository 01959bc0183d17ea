use super::*;

use crate::controller::events::parse_command;

fn app() -> AppController {
    AppController::new(&SessionSettings::default(), false)
}

async fn run(app: &mut AppController, script: &str) {
    for line in script.lines() {
        if let Some(command) = parse_command(line).expect("valid command") {
            app.dispatch(command).await;
        }
    }
}

#[tokio::test]
async fn create_edit_sort_save_round() {
    let mut app = app();

    run(
        &mut app,
        "create
         set username zedperson
         set lastname Zed
         sort
         sort
         save",
    )
    .await;

    let state = app.session().view_state();
    assert!(!state.has_unsaved_changes);
    assert!(!state.username_field_empty);
    assert_eq!(state.sort_order_index, 2);
    let transcript = app.screen().transcript();
    assert!(transcript.contains(&"[toast] Users sorted by last name descending".to_string()));
    assert!(transcript.contains(&"[toast] Changes sent".to_string()));
    assert_eq!(app.collection().visible()[0].1.last_name, "Zed");
}

#[tokio::test]
async fn rejected_save_turns_into_a_latched_technical_error() {
    let mut app = app();

    run(&mut app, "create\nsave").await;

    assert!(app.session().has_technical_error());
    assert!(app.screen().has_open_alert());

    run(&mut app, "technical Gateway timeout").await;
    let errors: Vec<String> = app
        .screen()
        .transcript()
        .into_iter()
        .filter(|line| line.starts_with("[error]"))
        .collect();
    assert_eq!(
        errors,
        vec![
            "[error] UserName must not be empty".to_string(),
            "[error] UserName must not be empty".to_string(),
        ]
    );

    run(&mut app, "dismiss\nreset").await;
    assert!(!app.session().is_alert_open());
    assert!(!app.session().view_state().has_unsaved_changes);
}

#[tokio::test]
async fn selecting_then_deleting_collapses_the_detail_pane() {
    let mut app = app();

    run(&mut app, "select 2").await;
    assert!(app.screen().layout().visible);
    assert_eq!(app.screen().layout().width_percent, 60);

    run(&mut app, "delete").await;
    let layout = app.screen().layout();
    assert!(!layout.visible);
    assert_eq!(layout.width_percent, 100);
    assert_eq!(layout.search_width_percent, 25);
    assert_eq!(app.collection().visible().len(), 4);
}

#[tokio::test]
async fn edits_after_create_target_the_new_row() {
    let mut app = app();

    run(&mut app, "select 2\ncreate\nset username newcomer").await;

    let visible = app.collection().visible();
    assert_eq!(visible.len(), 6);
    assert_eq!(visible[1].1.user_name, "scottketchum");
    assert_eq!(visible[5].1.user_name, "newcomer");
    assert!(!app.session().view_state().username_field_empty);
}

#[tokio::test]
async fn edits_without_selection_are_refused() {
    let mut app = app();

    run(&mut app, "set lastname Nobody").await;

    assert!(app
        .screen()
        .transcript()
        .contains(&"select or create a row first".to_string()));
    assert!(!app.session().view_state().has_unsaved_changes);
}

#[tokio::test]
async fn quit_stops_the_loop() {
    let mut app = app();
    assert_eq!(app.dispatch(UiCommand::Quit).await, Flow::Quit);
    assert_eq!(app.dispatch(UiCommand::State).await, Flow::Continue);
}
