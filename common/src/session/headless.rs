use std::time::Duration;

use crate::protocol::ClientRequest;

use super::clock::VirtualClock;
use super::coordinator::SessionCoordinator;
use super::events::{BoardView, Effect, SessionEvent, StatusMessage};
use super::types::SessionTimings;

/// Upper bound on timers fired by one `run_until_idle`. CPU and local games
/// restart forever, so an idle point is not guaranteed.
const MAX_TIMERS_PER_RUN: usize = 1000;

/// A coordinator driven by a [`VirtualClock`], recording what a front end
/// would have shown and sent.
#[derive(Debug, Default)]
pub struct HeadlessSession {
    coordinator: SessionCoordinator,
    clock: VirtualClock,
    sent: Vec<ClientRequest>,
    statuses: Vec<StatusMessage>,
    last_view: Option<BoardView>,
    connect_requests: usize,
}

impl HeadlessSession {
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            coordinator: SessionCoordinator::new(timings),
            ..Self::default()
        }
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn dispatch(&mut self, event: SessionEvent) {
        let effects = self.coordinator.handle(event);
        for effect in effects {
            self.record(effect);
        }
    }

    /// Moves virtual time forward, firing every timer that falls due in
    /// order. Timers scheduled while advancing fire too if they are due.
    pub fn advance(&mut self, delta: Duration) {
        let deadline = self.clock.now() + delta;
        while let Some(token) = self.clock.pop_next_until(deadline) {
            self.dispatch(SessionEvent::TimerFired(token));
        }
        self.clock.advance_to(deadline);
    }

    /// Fires pending timers one by one until none is left or `max_timers`
    /// have fired. Returns how many fired.
    pub fn run_timers(&mut self, max_timers: usize) -> usize {
        let mut fired = 0;
        while fired < max_timers {
            let Some(deadline) = self.clock.next_deadline() else {
                break;
            };
            let Some(token) = self.clock.pop_next_until(deadline) else {
                break;
            };
            self.dispatch(SessionEvent::TimerFired(token));
            fired += 1;
        }
        fired
    }

    pub fn run_until_idle(&mut self) -> usize {
        self.run_timers(MAX_TIMERS_PER_RUN)
    }

    pub fn take_sent(&mut self) -> Vec<ClientRequest> {
        std::mem::take(&mut self.sent)
    }

    pub fn statuses(&self) -> &[StatusMessage] {
        &self.statuses
    }

    pub fn last_status(&self) -> Option<&StatusMessage> {
        self.statuses.last()
    }

    pub fn last_view(&self) -> Option<&BoardView> {
        self.last_view.as_ref()
    }

    pub fn connect_requests(&self) -> usize {
        self.connect_requests
    }

    fn record(&mut self, effect: Effect) {
        if self.clock.apply(&effect) {
            return;
        }
        match effect {
            Effect::Render(view) => self.last_view = Some(view),
            Effect::Status(status) => self.statuses.push(status),
            Effect::Send(request) => self.sent.push(request),
            Effect::Connect => self.connect_requests += 1,
            Effect::Scores(_) | Effect::Room(_) | Effect::ShowMarkPicker => {}
            Effect::ScheduleTimer { .. } | Effect::CancelTimer(_) => {}
        }
    }
}
