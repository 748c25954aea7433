//! Test doubles shared by the unit tests
//!
//! [`Scheduler`] is a virtual clock: alarms are queued with their due time
//! and popped in due order, advancing the clock to each alarm as it fires.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    AlarmMessage, SyncMessage, UpdateMessage,
    board::{Board, BoardRound, Clue, ClueId, FinalClue},
    constants::board::{CATEGORY_COUNT, VALUES_PER_CATEGORY},
    player::Player,
    services::{JudgmentRequest, Services, Ticket},
    session::Tunnel,
};

/// Records everything sent to the presentation layer
#[derive(Debug, Clone, Default)]
pub struct MockTunnel {
    messages: Arc<Mutex<Vec<UpdateMessage>>>,
    states: Arc<Mutex<Vec<SyncMessage>>>,
}

impl MockTunnel {
    pub fn messages(&self) -> Vec<UpdateMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<SyncMessage> {
        self.states.lock().unwrap().clone()
    }
}

impl Tunnel for MockTunnel {
    fn send_message(&self, message: &UpdateMessage) {
        self.messages.lock().unwrap().push(message.clone());
    }

    fn send_state(&self, state: &SyncMessage) {
        self.states.lock().unwrap().push(state.clone());
    }
}

/// A request made to the collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartCapture(Ticket, Player),
    StopCapture,
    Judge(JudgmentRequest),
    Persist(Vec<ClueId>),
}

/// Records collaborator requests without answering them
#[derive(Debug, Clone, Default)]
pub struct MockServices {
    calls: Vec<Call>,
}

impl MockServices {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.clone()
    }

    pub fn captures(&self) -> Vec<(Ticket, Player)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::StartCapture(ticket, player) => Some((*ticket, *player)),
                _ => None,
            })
            .collect()
    }

    pub fn last_capture(&self) -> Option<(Ticket, Player)> {
        self.captures().pop()
    }

    pub fn judgments(&self) -> Vec<JudgmentRequest> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Judge(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_judgment(&self) -> Option<JudgmentRequest> {
        self.judgments().pop()
    }
}

impl Services for MockServices {
    fn start_capture(&mut self, ticket: Ticket, player: Player) {
        self.calls.push(Call::StartCapture(ticket, player));
    }

    fn stop_capture(&mut self) {
        self.calls.push(Call::StopCapture);
    }

    fn request_judgment(&mut self, request: JudgmentRequest) {
        self.calls.push(Call::Judge(request));
    }

    fn persist_used_clues(&mut self, ids: Vec<ClueId>) {
        self.calls.push(Call::Persist(ids));
    }
}

#[derive(Debug)]
struct Pending {
    due: Duration,
    seq: u64,
    delay: Duration,
    alarm: AlarmMessage,
}

#[derive(Debug, Default)]
struct Clock {
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
}

/// Virtual-time alarm queue
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    clock: Arc<Mutex<Clock>>,
}

impl Scheduler {
    /// Returns a scheduling closure feeding this queue
    pub fn schedule_fn(&self) -> impl FnMut(AlarmMessage, Duration) + use<> {
        let clock = Arc::clone(&self.clock);
        move |alarm, delay| {
            let mut clock = clock.lock().unwrap();
            let due = clock.now + delay;
            let seq = clock.seq;
            clock.seq += 1;
            clock.pending.push(Pending {
                due,
                seq,
                delay,
                alarm,
            });
        }
    }

    fn next_index(clock: &Clock) -> Option<usize> {
        clock
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, pending)| (pending.due, pending.seq))
            .map(|(index, _)| index)
    }

    /// Removes the alarm due next and moves the clock to its due time
    pub fn pop(&self) -> Option<(AlarmMessage, Duration)> {
        let mut clock = self.clock.lock().unwrap();
        let index = Self::next_index(&clock)?;
        let pending = clock.pending.remove(index);
        clock.now = pending.due;
        Some((pending.alarm, pending.delay))
    }

    /// The alarm due next, without firing it
    pub fn peek(&self) -> Option<(AlarmMessage, Duration)> {
        let clock = self.clock.lock().unwrap();
        let index = Self::next_index(&clock)?;
        let pending = &clock.pending[index];
        Some((pending.alarm.clone(), pending.delay))
    }

    /// The alarm scheduled most recently, still pending
    pub fn last_scheduled(&self) -> Option<(AlarmMessage, Duration)> {
        let clock = self.clock.lock().unwrap();
        clock
            .pending
            .iter()
            .max_by_key(|pending| pending.seq)
            .map(|pending| (pending.alarm.clone(), pending.delay))
    }

    pub fn is_empty(&self) -> bool {
        self.clock.lock().unwrap().pending.is_empty()
    }

    /// Virtual time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.clock.lock().unwrap().now
    }
}

fn board_round(prefix: &str, label: &str, step: u32, daily_doubles: &[(usize, usize)]) -> BoardRound {
    let clues = (0..CATEGORY_COUNT)
        .flat_map(|category| (0..VALUES_PER_CATEGORY).map(move |value| (category, value)))
        .map(|(category, value)| Clue {
            id: ClueId::from(format!("{prefix}-{category}-{value}")),
            category: format!("{label} {category}"),
            value: step * (value as u32 + 1),
            text: format!("{label} clue {category}-{value}"),
            response: format!("Response {prefix} {category}-{value}"),
            daily_double: daily_doubles.contains(&(category, value)),
        })
        .collect();

    BoardRound {
        categories: (0..CATEGORY_COUNT)
            .map(|category| format!("{label} {category}"))
            .collect(),
        clues,
    }
}

/// A complete board with one daily double in the standard round and two in
/// the double round
pub fn test_board() -> Board {
    Board {
        standard: board_round("s", "Category", 200, &[(1, 2)]),
        double: board_round("d", "Double Category", 400, &[(3, 4), (5, 2)]),
        final_clue: Some(FinalClue {
            category: "Final Category".to_owned(),
            text: "Final clue text".to_owned(),
            response: "Final response".to_owned(),
        }),
    }
}
