use core::cell::RefCell;
use core::future::{self, Future};
use duelsweeper_protocol::{EventKind, PresenceRecord, PresenceState};
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::*;

/// A broadcast the hub accepted, kept for inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub from: usize,
    pub event: EventKind,
    pub payload: Value,
}

#[derive(Debug, Default)]
struct Member {
    sender: Option<UnboundedSender<ChannelEvent>>,
    presence: Option<PresenceRecord>,
}

impl Member {
    fn notify(&self, event: ChannelEvent) {
        if let Some(sender) = &self.sender {
            // a dropped receiver just stops listening
            let _ = sender.unbounded_send(event);
        }
    }
}

#[derive(Debug, Default)]
struct Room {
    next_id: usize,
    members: BTreeMap<usize, Member>,
    deliveries: Vec<Delivery>,
}

impl Room {
    fn presence_state(&self) -> PresenceState {
        self.members
            .values()
            .filter_map(|member| member.presence)
            .map(|record| (record.key(), vec![record]))
            .collect()
    }
}

/// In-process presence + broadcast transport. Every [`LocalChannel`] handed out for the same room
/// id sees the others' presence and broadcasts.
#[derive(Clone, Debug, Default)]
pub struct LocalHub {
    rooms: Rc<RefCell<HashMap<String, Room>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, room_id: &str) -> LocalChannel {
        let mut rooms = self.rooms.borrow_mut();
        let room = rooms.entry(room_id.to_owned()).or_default();
        let member = room.next_id;
        room.next_id += 1;
        room.members.insert(member, Member::default());

        LocalChannel {
            hub: self.clone(),
            room_id: room_id.to_owned(),
            member,
        }
    }

    /// Every broadcast accepted in `room_id`, oldest first.
    pub fn deliveries(&self, room_id: &str) -> Vec<Delivery> {
        self.rooms
            .borrow()
            .get(room_id)
            .map(|room| room.deliveries.clone())
            .unwrap_or_default()
    }

    pub fn presence_state(&self, room_id: &str) -> PresenceState {
        self.rooms
            .borrow()
            .get(room_id)
            .map(Room::presence_state)
            .unwrap_or_default()
    }

    fn with_room<T>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> T) -> T {
        let mut rooms = self.rooms.borrow_mut();
        f(rooms.entry(room_id.to_owned()).or_default())
    }
}

#[derive(Debug)]
pub struct LocalChannel {
    hub: LocalHub,
    room_id: String,
    member: usize,
}

impl LocalChannel {
    /// Identifies this channel in [`Delivery::from`].
    pub fn id(&self) -> usize {
        self.member
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn send_broadcast(&self, event: EventKind, payload: Value) -> Result<(), ChannelError> {
        let member = self.member;
        self.hub.with_room(&self.room_id, |room| {
            if !room.members.get(&member).is_some_and(|m| m.sender.is_some()) {
                return Err(ChannelError::NotSubscribed);
            }

            for (_, other) in room.members.iter().filter(|(id, _)| **id != member) {
                other.notify(ChannelEvent::Broadcast {
                    event: event.as_str().to_owned(),
                    payload: payload.clone(),
                });
            }
            room.deliveries.push(Delivery {
                from: member,
                event,
                payload,
            });
            Ok(())
        })
    }
}

impl Channel for LocalChannel {
    type Events = UnboundedReceiver<ChannelEvent>;

    fn subscribe(&mut self) -> Result<Self::Events, ChannelError> {
        let member = self.member;
        self.hub.with_room(&self.room_id, |room| {
            let entry = room.members.entry(member).or_default();
            if entry.sender.is_some() {
                return Err(ChannelError::AlreadySubscribed);
            }

            let (sender, receiver) = unbounded();
            entry.sender = Some(sender);
            entry.notify(ChannelEvent::Status(SubscriptionStatus::Subscribed));
            log::debug!("Member {} subscribed to {}", member, self.room_id);
            Ok(receiver)
        })
    }

    fn unsubscribe(&mut self) {
        self.untrack();
        let member = self.member;
        self.hub.with_room(&self.room_id, |room| {
            if let Some(entry) = room.members.remove(&member) {
                entry.notify(ChannelEvent::Status(SubscriptionStatus::Closed));
            }
        });
        log::debug!("Member {} unsubscribed from {}", member, self.room_id);
    }

    fn track(&mut self, record: PresenceRecord) -> Result<(), ChannelError> {
        let member = self.member;
        self.hub.with_room(&self.room_id, |room| {
            if !room.members.get(&member).is_some_and(|m| m.sender.is_some()) {
                return Err(ChannelError::NotSubscribed);
            }

            let mut existing: Vec<_> = room
                .members
                .iter()
                .filter(|(id, _)| **id != member)
                .filter_map(|(_, other)| other.presence)
                .collect();
            existing.sort_by_key(|record| record.create_at);

            if let Some(entry) = room.members.get_mut(&member) {
                entry.presence = Some(record);
            }

            let joined = ChannelEvent::Join {
                key: record.key(),
                new_presences: vec![record],
            };
            for (id, other) in &room.members {
                if *id == member {
                    // the newcomer learns about everyone already present first
                    for present in &existing {
                        other.notify(ChannelEvent::Join {
                            key: present.key(),
                            new_presences: vec![*present],
                        });
                    }
                }
                other.notify(joined.clone());
                other.notify(ChannelEvent::Sync);
            }
            Ok(())
        })
    }

    fn untrack(&mut self) {
        let member = self.member;
        self.hub.with_room(&self.room_id, |room| {
            let Some(record) = room
                .members
                .get_mut(&member)
                .and_then(|entry| entry.presence.take())
            else {
                return;
            };

            for (_, other) in room.members.iter().filter(|(id, _)| **id != member) {
                other.notify(ChannelEvent::Leave {
                    key: record.key(),
                    left_presences: vec![record],
                });
                other.notify(ChannelEvent::Sync);
            }
        });
    }

    fn presence_state(&self) -> PresenceState {
        self.hub.presence_state(&self.room_id)
    }

    fn broadcast(
        &mut self,
        event: EventKind,
        payload: Value,
    ) -> impl Future<Output = Result<(), ChannelError>> {
        future::ready(self.send_broadcast(event, payload))
    }
}
