//! Routes parsed UI commands to the edit-session controllers.

use std::sync::Arc;

use client_core::{
    Collaborators, DefaultTexts, EditSessionController, EntityCollection, ListView,
    MemoryCollection, MemoryMessageChannel, Notifier, SelectionController, SessionSettings,
    SortFilterController, TextCatalog, TextKey,
};
use shared::{
    domain::{EntityHandle, PersonField},
    error::ErrorCode,
    protocol::ServiceMessage,
};
use tracing::{debug, warn};

use crate::{console::ConsoleScreen, controller::events::{UiCommand, HELP}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct AppController {
    collection: Arc<MemoryCollection>,
    channel: Arc<MemoryMessageChannel>,
    screen: Arc<ConsoleScreen>,
    texts: Arc<dyn TextCatalog>,
    session: EditSessionController,
    selection: SelectionController,
    sort_filter: SortFilterController,
}

impl AppController {
    pub fn new(settings: &SessionSettings, echo: bool) -> Self {
        let channel = Arc::new(MemoryMessageChannel::new());
        let collection =
            Arc::new(MemoryCollection::sample().with_message_channel(Arc::clone(&channel)));
        let screen = Arc::new(ConsoleScreen::new(Arc::clone(&collection), echo));
        let texts: Arc<dyn TextCatalog> = Arc::new(DefaultTexts);
        let collaborators = Collaborators {
            collection: collection.clone(),
            messages: channel.clone(),
            list: screen.clone(),
            detail: screen.clone(),
            notifier: screen.clone(),
            texts: Arc::clone(&texts),
        };

        Self {
            session: EditSessionController::new(&collaborators, settings),
            selection: SelectionController::new(&collaborators, settings.layout),
            sort_filter: SortFilterController::new(collaborators.collection.clone(), settings),
            collection,
            channel,
            screen,
            texts,
        }
    }

    pub fn screen(&self) -> &ConsoleScreen {
        &self.screen
    }

    pub fn session(&self) -> &EditSessionController {
        &self.session
    }

    pub fn collection(&self) -> &MemoryCollection {
        &self.collection
    }

    pub async fn dispatch(&mut self, command: UiCommand) -> Flow {
        debug!(command = command.name(), "dispatching ui command");
        let flow = self.apply(command).await;
        let handled = self.session.pump_technical_messages();
        if handled > 0 {
            debug!(batches = handled, "technical message batches handled");
        }
        flow
    }

    async fn apply(&mut self, command: UiCommand) -> Flow {
        // Failed operations have already been shown by the controllers.
        let outcome = match command {
            UiCommand::List => {
                self.screen.render_rows();
                Ok(())
            }
            UiCommand::Create => {
                let handle = self.session.create();
                self.screen.print(format!("created row #{handle}"));
                Ok(())
            }
            UiCommand::Set { field, value } => {
                self.set_field(field, &value);
                Ok(())
            }
            UiCommand::Escape => {
                self.session.input_changed(true, false);
                Ok(())
            }
            UiCommand::Select { row } => {
                self.select_row(row);
                Ok(())
            }
            UiCommand::Delete => {
                let selected = self.screen.selected_handle();
                self.session.delete(selected).await
            }
            UiCommand::Search { text } => {
                self.sort_filter.search(&text);
                Ok(())
            }
            UiCommand::Sort => {
                let order = self.sort_filter.toggle_sort();
                self.session.record_sort_order(order);
                let label = self.texts.text(TextKey::sort_label(order), &[]);
                self.screen
                    .toast(&self.texts.text(TextKey::SortMessage, &[label.as_str()]));
                Ok(())
            }
            UiCommand::Save => self.session.save().await,
            UiCommand::Reset => {
                self.session.reset_changes();
                Ok(())
            }
            UiCommand::Refresh => self.session.refresh().await,
            UiCommand::ResetSource => self.session.reset_data_source().await,
            UiCommand::Technical { message } => {
                self.channel.post(vec![ServiceMessage::technical(message)]);
                Ok(())
            }
            UiCommand::Dismiss => {
                if !self.screen.dismiss_alert() {
                    self.screen.print("no alert is open");
                }
                Ok(())
            }
            UiCommand::Fail { point, message } => {
                self.collection.fail_next(point, ErrorCode::Internal, message);
                Ok(())
            }
            UiCommand::State => {
                self.print_state();
                Ok(())
            }
            UiCommand::Help => {
                self.screen.print(HELP);
                Ok(())
            }
            UiCommand::Quit => return Flow::Quit,
        };

        if let Err(err) = outcome {
            debug!(error = %err, "ui command finished with an error");
        }
        Flow::Continue
    }

    fn editing_handle(&self) -> Option<EntityHandle> {
        self.screen
            .selected_handle()
            .or_else(|| self.selection.pinned())
    }

    fn set_field(&mut self, field: PersonField, value: &str) {
        let Some(handle) = self.editing_handle() else {
            self.screen.print("select or create a row first");
            return;
        };
        if let Err(err) = self.collection.set_field(handle, field, value) {
            warn!(%handle, error = %err, "edit rejected");
            self.screen.print(format!("[error] {}", err.message));
            return;
        }
        let username_non_empty = self
            .collection
            .get(handle)
            .is_some_and(|person| !person.user_name.is_empty());
        self.session.input_changed(false, username_non_empty);
    }

    fn select_row(&mut self, row: usize) {
        let rendered = self.screen.rendered_handles();
        let Some(handle) = row
            .checked_sub(1)
            .and_then(|index| rendered.get(index).copied())
        else {
            self.screen.print(format!("there is no row {row}"));
            return;
        };
        self.screen.focus_and_select(handle);
        if let Err(err) = self.selection.select(handle) {
            debug!(%handle, error = %err, "selection failed");
        }
    }

    fn print_state(&self) {
        let state = self.session.view_state();
        match serde_json::to_string(&state) {
            Ok(json) => self.screen.print(json),
            Err(err) => warn!(error = %err, "failed to render view state"),
        }
        self.screen.print(format!(
            "technical_error={} alert_open={} pinned={}",
            self.session.has_technical_error(),
            self.session.is_alert_open(),
            self.selection
                .pinned()
                .map_or_else(|| "-".to_string(), |handle| handle.to_string())
        ));
    }
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
