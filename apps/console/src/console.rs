//! Console rendition of the list, detail pane and notifications.

use std::sync::{Arc, Mutex, MutexGuard};

use client_core::{AlertDismissal, DetailView, EntityCollection, ListView, MemoryCollection, Notifier};
use shared::domain::EntityHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailLayout {
    pub bound: Option<EntityHandle>,
    pub visible: bool,
    pub width_percent: u8,
    pub resizable: bool,
    pub search_width_percent: u8,
}

impl Default for DetailLayout {
    fn default() -> Self {
        Self {
            bound: None,
            visible: false,
            width_percent: 100,
            resizable: false,
            search_width_percent: 25,
        }
    }
}

/// Writes every UI effect to stdout and keeps a transcript of it.
pub struct ConsoleScreen {
    collection: Arc<MemoryCollection>,
    selected: Mutex<Option<EntityHandle>>,
    layout: Mutex<DetailLayout>,
    alert: Mutex<Option<AlertDismissal>>,
    transcript: Mutex<Vec<String>>,
    echo: bool,
}

impl ConsoleScreen {
    pub fn new(collection: Arc<MemoryCollection>, echo: bool) -> Self {
        Self {
            collection,
            selected: Mutex::new(None),
            layout: Mutex::new(DetailLayout::default()),
            alert: Mutex::new(None),
            transcript: Mutex::new(Vec::new()),
            echo,
        }
    }

    pub fn print(&self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{line}");
        }
        lock(&self.transcript).push(line);
    }

    pub fn transcript(&self) -> Vec<String> {
        lock(&self.transcript).clone()
    }

    pub fn layout(&self) -> DetailLayout {
        *lock(&self.layout)
    }

    pub fn has_open_alert(&self) -> bool {
        lock(&self.alert).is_some()
    }

    /// Closes the open alert, if any.
    pub fn dismiss_alert(&self) -> bool {
        match lock(&self.alert).take() {
            Some(alert) => {
                alert.dismiss();
                self.print("[alert] closed");
                true
            }
            None => false,
        }
    }

    pub fn render_rows(&self) {
        let rows = self.collection.visible();
        if rows.is_empty() {
            self.print("(no rows)");
            return;
        }
        let selected = self.selected_handle();
        let bound = self.layout().bound;
        for (index, (handle, person)) in rows.iter().enumerate() {
            let marker = match (Some(*handle) == selected, Some(*handle) == bound) {
                (true, true) => "*>",
                (true, false) => "* ",
                (false, true) => " >",
                (false, false) => "  ",
            };
            self.print(format!(
                "{marker}{:>2}. {:<16} {:<12} {:<12} {:>3}",
                index + 1,
                display_or_dash(&person.user_name),
                display_or_dash(&person.first_name),
                display_or_dash(&person.last_name),
                person.age
            ));
        }
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

impl ListView for ConsoleScreen {
    fn selected_handle(&self) -> Option<EntityHandle> {
        let selected = *lock(&self.selected);
        selected.filter(|handle| self.collection.get(*handle).is_some())
    }

    fn rendered_handles(&self) -> Vec<EntityHandle> {
        self.collection
            .visible()
            .into_iter()
            .map(|(handle, _)| handle)
            .collect()
    }

    fn focus_and_select(&self, handle: EntityHandle) {
        *lock(&self.selected) = Some(handle);
    }

    fn set_search_width(&self, width_percent: u8) {
        lock(&self.layout).search_width_percent = width_percent;
    }
}

impl DetailView for ConsoleScreen {
    fn bind(&self, handle: Option<EntityHandle>) {
        lock(&self.layout).bound = handle;
    }

    fn set_detail_visible(&self, visible: bool) {
        lock(&self.layout).visible = visible;
        self.print(if visible {
            "[layout] detail pane shown"
        } else {
            "[layout] detail pane hidden"
        });
    }

    fn resize_detail_pane(&self, width_percent: u8, resizable: bool) {
        let mut layout = lock(&self.layout);
        layout.width_percent = width_percent;
        layout.resizable = resizable;
    }
}

impl Notifier for ConsoleScreen {
    fn toast(&self, text: &str) {
        self.print(format!("[toast] {text}"));
    }

    fn blocking_error(&self, text: &str, on_close: Option<AlertDismissal>) {
        self.print(format!("[error] {text}"));
        if let Some(on_close) = on_close {
            self.print("[alert] open until 'dismiss'");
            *lock(&self.alert) = Some(on_close);
        }
    }
}
