//! In-memory collection and message feed. They behave like a remote people
//! service with a single deferred batch group, and back the console app and
//! the workflow tests.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use shared::{
    domain::{EntityHandle, Person, PersonField, SubscriptionId},
    error::{CollectionError, ErrorCode},
    protocol::{FieldFilter, FilterOperator, MessageFilter, ServiceMessage, Sorter, UpdateGroup},
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

use crate::collaborators::{DetachCallback, EntityCollection, MessageChannel, MessageSubscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Submit,
    Delete,
    Refresh,
    ResetSource,
}

#[derive(Debug, Clone)]
struct Row {
    handle: EntityHandle,
    // Server copy; `None` until the row has been submitted.
    committed: Option<Person>,
    current: Person,
    pending_delete: bool,
}

impl Row {
    fn has_changes(&self) -> bool {
        self.pending_delete || self.committed.as_ref() != Some(&self.current)
    }
}

#[derive(Default)]
struct CollectionState {
    seed: Vec<Person>,
    server: Vec<Person>,
    rows: Vec<Row>,
    next_handle: u64,
    filter: Option<FieldFilter>,
    sorter: Option<Sorter>,
    keep_alive: HashMap<EntityHandle, DetachCallback>,
    failures: HashMap<FailPoint, CollectionError>,
    submitted_groups: Vec<String>,
    refresh_count: usize,
}

impl CollectionState {
    fn allocate_handle(&mut self) -> EntityHandle {
        self.next_handle += 1;
        EntityHandle(self.next_handle)
    }

    fn row_index(&self, handle: EntityHandle) -> Option<usize> {
        self.rows.iter().position(|row| row.handle == handle)
    }

    /// Drops rows and hands back the detach callbacks to fire once the
    /// state lock is released.
    fn destroy(&mut self, handles: &HashSet<EntityHandle>) -> Vec<DetachCallback> {
        self.rows.retain(|row| !handles.contains(&row.handle));
        handles
            .iter()
            .filter_map(|handle| self.keep_alive.remove(handle))
            .collect()
    }

    fn reload_from_server(&mut self) -> Vec<DetachCallback> {
        let mut previous: HashMap<String, EntityHandle> = self
            .rows
            .iter()
            .filter_map(|row| {
                row.committed
                    .as_ref()
                    .map(|committed| (committed.user_name.clone(), row.handle))
            })
            .collect();

        let server = self.server.clone();
        let mut rows = Vec::with_capacity(server.len());
        for person in server {
            let handle = match previous.remove(&person.user_name) {
                Some(handle) => handle,
                None => self.allocate_handle(),
            };
            rows.push(Row {
                handle,
                committed: Some(person.clone()),
                current: person,
                pending_delete: false,
            });
        }

        let kept: HashSet<EntityHandle> = rows.iter().map(|row| row.handle).collect();
        let gone: HashSet<EntityHandle> = self
            .rows
            .iter()
            .map(|row| row.handle)
            .filter(|handle| !kept.contains(handle))
            .collect();
        self.rows = rows;
        gone.iter()
            .filter_map(|handle| self.keep_alive.remove(handle))
            .collect()
    }

    fn take_failure(&mut self, point: FailPoint) -> Result<(), CollectionError> {
        match self.failures.remove(&point) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn commit_batch(&mut self) -> Result<Vec<DetachCallback>, CollectionError> {
        self.take_failure(FailPoint::Submit)?;
        self.validate_batch()?;

        let deleted: HashSet<EntityHandle> = self
            .rows
            .iter()
            .filter(|row| row.pending_delete)
            .map(|row| row.handle)
            .collect();
        let callbacks = self.destroy(&deleted);
        for row in &mut self.rows {
            row.committed = Some(row.current.clone());
        }
        self.server = self.rows.iter().map(|row| row.current.clone()).collect();
        Ok(callbacks)
    }

    fn validate_batch(&self) -> Result<(), CollectionError> {
        let mut seen = HashSet::new();
        for row in self.rows.iter().filter(|row| !row.pending_delete) {
            let user_name = row.current.user_name.trim();
            if user_name.is_empty() {
                return Err(CollectionError::validation("UserName must not be empty"));
            }
            if !seen.insert(user_name.to_string()) {
                return Err(CollectionError::new(
                    ErrorCode::Conflict,
                    format!("UserName '{user_name}' already exists"),
                ));
            }
        }
        Ok(())
    }
}

fn matches_filter(person: &Person, filter: &FieldFilter) -> bool {
    let value = person.field(filter.field);
    match filter.operator {
        FilterOperator::Contains => value
            .to_lowercase()
            .contains(&filter.value.to_lowercase()),
    }
}

fn compare_field(left: &Person, right: &Person, field: PersonField) -> CmpOrdering {
    if field == PersonField::Age {
        if let (Ok(l), Ok(r)) = (left.age.parse::<u32>(), right.age.parse::<u32>()) {
            return l.cmp(&r);
        }
    }
    left.field(field).cmp(right.field(field))
}

fn fire(callbacks: Vec<DetachCallback>) {
    for callback in callbacks {
        callback();
    }
}

/// People collection with one deferred batch group. Changes made through
/// [`EntityCollection::create`] and [`EntityCollection::set_field`] stay
/// local until [`EntityCollection::submit_batch`].
pub struct MemoryCollection {
    state: Mutex<CollectionState>,
    messages: Option<Arc<MemoryMessageChannel>>,
}

impl MemoryCollection {
    pub fn new(seed: Vec<Person>) -> Self {
        let mut state = CollectionState {
            seed: seed.clone(),
            server: seed,
            ..CollectionState::default()
        };
        state.reload_from_server();
        Self {
            state: Mutex::new(state),
            messages: None,
        }
    }

    /// Failed submits are additionally reported on `channel` as technical
    /// messages, the way a batch endpoint reports per-request errors.
    pub fn with_message_channel(mut self, channel: Arc<MemoryMessageChannel>) -> Self {
        self.messages = Some(channel);
        self
    }

    pub fn sample() -> Self {
        Self::new(sample_people())
    }

    /// Makes the next call at `point` fail with `message`.
    pub fn fail_next(&self, point: FailPoint, code: ErrorCode, message: impl Into<String>) {
        lock(&self.state)
            .failures
            .insert(point, CollectionError::new(code, message));
    }

    /// Visible rows after filter and sort, in display order.
    pub fn visible(&self) -> Vec<(EntityHandle, Person)> {
        let state = lock(&self.state);
        let mut rows: Vec<(EntityHandle, Person)> = state
            .rows
            .iter()
            .filter(|row| !row.pending_delete)
            .filter(|row| {
                state
                    .filter
                    .as_ref()
                    .map_or(true, |filter| matches_filter(&row.current, filter))
            })
            .map(|row| (row.handle, row.current.clone()))
            .collect();
        if let Some(sorter) = state.sorter {
            rows.sort_by(|(_, left), (_, right)| {
                let ordering = compare_field(left, right, sorter.field);
                if sorter.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        rows
    }

    /// Rows as last submitted to the service.
    pub fn server_rows(&self) -> Vec<Person> {
        lock(&self.state).server.clone()
    }

    pub fn active_filter(&self) -> Option<FieldFilter> {
        lock(&self.state).filter.clone()
    }

    pub fn active_sorter(&self) -> Option<Sorter> {
        lock(&self.state).sorter
    }

    pub fn is_kept_alive(&self, handle: EntityHandle) -> bool {
        lock(&self.state).keep_alive.contains_key(&handle)
    }

    pub fn submitted_groups(&self) -> Vec<String> {
        lock(&self.state).submitted_groups.clone()
    }

    pub fn refresh_count(&self) -> usize {
        lock(&self.state).refresh_count
    }
}

#[async_trait]
impl EntityCollection for MemoryCollection {
    fn filter(&self, filter: Option<FieldFilter>) {
        lock(&self.state).filter = filter;
    }

    fn sort(&self, sorter: Option<Sorter>) {
        lock(&self.state).sorter = sorter;
    }

    fn create(&self, defaults: Person) -> EntityHandle {
        let mut state = lock(&self.state);
        let handle = state.allocate_handle();
        state.rows.push(Row {
            handle,
            committed: None,
            current: defaults,
            pending_delete: false,
        });
        handle
    }

    fn get(&self, handle: EntityHandle) -> Option<Person> {
        let state = lock(&self.state);
        state
            .row_index(handle)
            .map(|index| state.rows[index].current.clone())
    }

    fn set_field(
        &self,
        handle: EntityHandle,
        field: PersonField,
        value: &str,
    ) -> Result<(), CollectionError> {
        let mut state = lock(&self.state);
        let index = state
            .row_index(handle)
            .ok_or_else(|| CollectionError::not_found(format!("no entity for handle {handle}")))?;
        state.rows[index].current.set_field(field, value);
        Ok(())
    }

    async fn delete(
        &self,
        handle: EntityHandle,
        group: UpdateGroup,
    ) -> Result<(), CollectionError> {
        let callbacks = {
            let mut state = lock(&self.state);
            state.take_failure(FailPoint::Delete)?;
            let index = state
                .row_index(handle)
                .ok_or_else(|| CollectionError::not_found(format!("no entity for handle {handle}")))?;

            if let UpdateGroup::Named(group_id) = group {
                debug!(%handle, group = %group_id, "deletion deferred to batch");
                state.rows[index].pending_delete = true;
                return Ok(());
            }

            if let Some(committed) = state.rows[index].committed.clone() {
                state
                    .server
                    .retain(|person| person.user_name != committed.user_name);
            }
            state.destroy(&HashSet::from([handle]))
        };
        fire(callbacks);
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        lock(&self.state).rows.iter().any(Row::has_changes)
    }

    fn reset_changes(&self) {
        let callbacks = {
            let mut state = lock(&self.state);
            let created: HashSet<EntityHandle> = state
                .rows
                .iter()
                .filter(|row| row.committed.is_none())
                .map(|row| row.handle)
                .collect();
            for row in &mut state.rows {
                if let Some(committed) = &row.committed {
                    row.current = committed.clone();
                }
                row.pending_delete = false;
            }
            state.destroy(&created)
        };
        fire(callbacks);
    }

    async fn refresh(&self) -> Result<(), CollectionError> {
        let callbacks = {
            let mut state = lock(&self.state);
            state.take_failure(FailPoint::Refresh)?;
            if state.rows.iter().any(Row::has_changes) {
                return Err(CollectionError::new(
                    ErrorCode::Conflict,
                    "cannot refresh while changes are pending",
                ));
            }
            state.refresh_count += 1;
            state.reload_from_server()
        };
        fire(callbacks);
        Ok(())
    }

    async fn submit_batch(&self, group_id: &str) -> Result<(), CollectionError> {
        let outcome = {
            let mut state = lock(&self.state);
            state.submitted_groups.push(group_id.to_string());
            state.commit_batch()
        };

        match outcome {
            Ok(callbacks) => {
                fire(callbacks);
                info!(group = group_id, "batch committed");
                Ok(())
            }
            Err(err) => {
                if let Some(channel) = &self.messages {
                    channel.post(vec![
                        ServiceMessage::technical(err.message.clone()).with_target(group_id)
                    ]);
                }
                Err(err)
            }
        }
    }

    async fn reset_data_source(&self) -> Result<(), CollectionError> {
        let mut state = lock(&self.state);
        state.take_failure(FailPoint::ResetSource)?;
        state.server = state.seed.clone();
        info!(rows = state.server.len(), "data source reset to seed");
        Ok(())
    }

    fn keep_alive(
        &self,
        handle: EntityHandle,
        on_destroy: DetachCallback,
    ) -> Result<(), CollectionError> {
        let mut state = lock(&self.state);
        if state.row_index(handle).is_none() {
            return Err(CollectionError::not_found(format!(
                "cannot keep alive unknown handle {handle}"
            )));
        }
        state.keep_alive.insert(handle, on_destroy);
        Ok(())
    }

    fn release(&self, handle: EntityHandle) -> Result<(), CollectionError> {
        lock(&self.state)
            .keep_alive
            .remove(&handle)
            .map(drop)
            .ok_or_else(|| CollectionError::not_found(format!("handle {handle} is not kept alive")))
    }
}

pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("russellwhyte", "Russell", "Whyte", 32),
        Person::new("scottketchum", "Scott", "Ketchum", 27),
        Person::new("ronaldmundy", "Ronald", "Mundy", 41),
        Person::new("javieralfred", "Javier", "Alfred", 23),
        Person::new("willieashmore", "Willie", "Ashmore", 35),
    ]
}

struct Subscriber {
    id: SubscriptionId,
    filter: MessageFilter,
    tx: UnboundedSender<Vec<ServiceMessage>>,
}

#[derive(Default)]
struct ChannelState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    unacknowledged: Vec<ServiceMessage>,
}

/// Message feed with per-subscription filters. Closed subscriptions are
/// pruned on the next post.
#[derive(Default)]
pub struct MemoryMessageChannel {
    state: Mutex<ChannelState>,
}

impl MemoryMessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, messages: Vec<ServiceMessage>) {
        let mut state = lock(&self.state);
        state.unacknowledged.extend(messages.iter().cloned());
        state.subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        for subscriber in &state.subscribers {
            let matching: Vec<ServiceMessage> = messages
                .iter()
                .filter(|message| subscriber.filter.matches(message))
                .cloned()
                .collect();
            if !matching.is_empty() && subscriber.tx.send(matching).is_err() {
                debug!(subscription = %subscriber.id, "subscriber closed during post");
            }
        }
    }

    pub fn unacknowledged(&self) -> Vec<ServiceMessage> {
        lock(&self.state).unacknowledged.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = lock(&self.state);
        state.subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        state.subscribers.len()
    }
}

impl MessageChannel for MemoryMessageChannel {
    fn subscribe(&self, filter: MessageFilter) -> MessageSubscription {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(Subscriber { id, filter, tx });
        MessageSubscription::new(id, rx)
    }

    fn remove(&self, messages: &[ServiceMessage]) -> Result<(), CollectionError> {
        let mut state = lock(&self.state);
        let before = state.unacknowledged.len();
        let ids: HashSet<_> = messages.iter().map(|message| message.id).collect();
        state
            .unacknowledged
            .retain(|message| !ids.contains(&message.id));
        if before - state.unacknowledged.len() < ids.len() {
            return Err(CollectionError::not_found(
                "some messages were already removed",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
