//! Core types for agent management

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Agent seniority level
///
/// Seniority drives the per-agent concurrent chat limit through an
/// efficiency multiplier, and drives selection order: the selector walks
/// seniorities junior-first so cheap capacity is consumed before senior
/// capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seniority {
    /// Entry-level agent
    Junior,
    /// Mid-level agent
    MidLevel,
    /// Senior agent
    Senior,
    /// Team lead, splitting time between chats and supervision
    TeamLead,
}

impl Seniority {
    /// Selection order for the junior-first walk
    pub const WALK_ORDER: [Seniority; 4] = [
        Seniority::Junior,
        Seniority::MidLevel,
        Seniority::Senior,
        Seniority::TeamLead,
    ];

    /// Efficiency multiplier applied to the base capacity
    pub fn multiplier(&self) -> f64 {
        match self {
            Seniority::Junior => 0.4,
            Seniority::MidLevel => 0.6,
            Seniority::Senior => 0.8,
            Seniority::TeamLead => 0.5,
        }
    }

    /// Concurrent chat limit for this seniority: `floor(base * multiplier)`
    ///
    /// ```
    /// use chatdesk_engine::agent::Seniority;
    ///
    /// assert_eq!(Seniority::Junior.max_concurrent(10), 4);
    /// assert_eq!(Seniority::MidLevel.max_concurrent(10), 6);
    /// assert_eq!(Seniority::Senior.max_concurrent(10), 8);
    /// assert_eq!(Seniority::TeamLead.max_concurrent(10), 5);
    /// ```
    pub fn max_concurrent(&self, base_capacity: u32) -> u32 {
        (base_capacity as f64 * self.multiplier()).floor() as u32
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seniority::Junior => write!(f, "Junior"),
            Seniority::MidLevel => write!(f, "MidLevel"),
            Seniority::Senior => write!(f, "Senior"),
            Seniority::TeamLead => write!(f, "TeamLead"),
        }
    }
}

/// Support team an agent belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Early-shift team
    TeamA,
    /// Mid-shift team
    TeamB,
    /// Late-shift team
    TeamC,
    /// Office-hours overflow pool
    Overflow,
}

impl Team {
    /// The three regular teams in cross-team rotation order
    pub const ROTATION: [Team; 3] = [Team::TeamA, Team::TeamB, Team::TeamC];
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::TeamA => write!(f, "TeamA"),
            Team::TeamB => write!(f, "TeamB"),
            Team::TeamC => write!(f, "TeamC"),
            Team::Overflow => write!(f, "Overflow"),
        }
    }
}

/// Agent identifier for strongly-typed agent references
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which clock a shift window is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftBasis {
    /// Window expressed in UTC minutes of day
    Utc,
    /// Window expressed in US-Eastern minutes of day
    Eastern,
}

/// Daily shift window in minutes of day
///
/// `end_minute` may exceed 1440 for a window that spills past midnight
/// (Team C works 15:55–24:05: five minutes of the next day absorb the
/// handoff to Team A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    /// Window start, minutes from local midnight
    pub start_minute: u32,
    /// Window end, minutes from local midnight; > 1440 spills into the next day
    pub end_minute: u32,
    /// Clock the window is evaluated against
    pub basis: ShiftBasis,
}

impl ShiftWindow {
    /// Build a window from hour/minute bounds
    pub fn new(start: (u32, u32), end: (u32, u32), basis: ShiftBasis) -> Self {
        Self {
            start_minute: start.0 * 60 + start.1,
            end_minute: end.0 * 60 + end.1,
            basis,
        }
    }

    /// Whether the given local minute of day falls inside the window
    ///
    /// ```
    /// use chatdesk_engine::agent::{ShiftBasis, ShiftWindow};
    ///
    /// // Team C: 15:55 to 24:05, spilling past midnight.
    /// let window = ShiftWindow::new((15, 55), (24, 5), ShiftBasis::Utc);
    /// assert!(window.contains(16 * 60));
    /// assert!(window.contains(3));       // 00:03 next day
    /// assert!(!window.contains(9 * 60));
    /// ```
    pub fn contains(&self, minute_of_day: u32) -> bool {
        if self.end_minute > MINUTES_PER_DAY {
            minute_of_day >= self.start_minute
                || minute_of_day <= self.end_minute - MINUTES_PER_DAY
        } else {
            minute_of_day >= self.start_minute && minute_of_day <= self.end_minute
        }
    }

    /// Minutes from the given local minute until the window closes
    ///
    /// Only meaningful when [`contains`](Self::contains) holds.
    pub fn minutes_until_end(&self, minute_of_day: u32) -> u32 {
        let logical = if self.end_minute > MINUTES_PER_DAY && minute_of_day < self.start_minute {
            minute_of_day + MINUTES_PER_DAY
        } else {
            minute_of_day
        };
        self.end_minute.saturating_sub(logical)
    }
}

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Mutable per-agent counters and flags, held as one record
///
/// `current`, `reserved`, and the shift flags change together under the
/// agent's lock so a reader never observes a torn reservation.
#[derive(Debug, Clone, Default)]
struct AgentState {
    /// Chats in progress
    current: u32,
    /// Capacity held by in-flight assignment attempts
    reserved: u32,
    /// Inside the shift window
    active: bool,
    /// Inside the window and more than the handoff margin from shift end
    accepting_new_chats: bool,
}

/// A support agent with fixed identity and a guarded load record
///
/// Identity fields (id, name, seniority, team, shift) never change after
/// roster construction. The load record mutates under per-agent exclusion
/// through the methods below; every reservation is eventually matched by
/// exactly one confirm or release.
#[derive(Debug)]
pub struct Agent {
    /// Stable identifier
    pub id: AgentId,
    /// Human-readable name
    pub display_name: String,
    /// Seniority level
    pub seniority: Seniority,
    /// Team assignment
    pub team: Team,
    /// Daily shift window
    pub shift: ShiftWindow,
    /// Concurrent chat limit, `floor(base * multiplier)`
    max_concurrent: u32,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Create an agent with zeroed counters and flags
    pub fn new(
        id: impl Into<AgentId>,
        display_name: impl Into<String>,
        seniority: Seniority,
        team: Team,
        shift: ShiftWindow,
        base_capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            seniority,
            team,
            shift,
            max_concurrent: seniority.max_concurrent(base_capacity),
            state: Mutex::new(AgentState::default()),
        }
    }

    /// Concurrent chat limit for this agent
    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Whether the agent is inside their shift window
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Whether the agent is eligible for new chat assignments
    pub fn is_accepting_new_chats(&self) -> bool {
        self.lock().accepting_new_chats
    }

    /// Chats currently in progress
    pub fn current(&self) -> u32 {
        self.lock().current
    }

    /// Capacity held by in-flight assignment attempts
    pub fn reserved(&self) -> u32 {
        self.lock().reserved
    }

    /// Free capacity: `max(0, max_concurrent - current - reserved)`
    pub fn available(&self) -> u32 {
        let state = self.lock();
        self.max_concurrent
            .saturating_sub(state.current + state.reserved)
    }

    /// Whether a new reservation would be admitted right now
    ///
    /// `active && accepting && current + reserved < max_concurrent`, the
    /// predicate the selector and the stores filter on.
    pub fn has_open_slot(&self) -> bool {
        let state = self.lock();
        state.active
            && state.accepting_new_chats
            && state.current + state.reserved < self.max_concurrent
    }

    /// Whether a commit could still land on this agent
    ///
    /// Unlike [`has_open_slot`](Self::has_open_slot) this ignores `reserved`:
    /// an assigner re-checking an agent it already holds a reservation on
    /// must not be defeated by its own hold.
    pub fn can_accept(&self) -> bool {
        let state = self.lock();
        state.active && state.accepting_new_chats && state.current < self.max_concurrent
    }

    /// Reserve one unit of capacity if the admission predicate holds
    ///
    /// Returns `false` when the agent is off shift, in handoff, or out of
    /// free slots. A successful reservation must later be matched by
    /// [`confirm_reservation`](Self::confirm_reservation) or
    /// [`release_reservation`](Self::release_reservation).
    pub fn try_reserve(&self) -> bool {
        let mut state = self.lock();
        if state.active
            && state.accepting_new_chats
            && state.current + state.reserved < self.max_concurrent
        {
            state.reserved += 1;
            true
        } else {
            false
        }
    }

    /// Return a held reservation to the pool
    ///
    /// Safe no-op when no reservation is held (e.g. it was already
    /// consumed by a confirm).
    pub fn release_reservation(&self) {
        let mut state = self.lock();
        if state.reserved > 0 {
            state.reserved -= 1;
        }
    }

    /// Convert a held reservation into an in-progress chat
    ///
    /// Returns `false` when no reservation is held.
    pub fn confirm_reservation(&self) -> bool {
        let mut state = self.lock();
        if state.reserved > 0 {
            state.reserved -= 1;
            state.current += 1;
            true
        } else {
            false
        }
    }

    /// Take a chat without a prior reservation
    ///
    /// Admitted under the same predicate as [`try_reserve`](Self::try_reserve);
    /// returns `false` when capacity is gone.
    pub fn assign_direct(&self) -> bool {
        let mut state = self.lock();
        if state.active
            && state.accepting_new_chats
            && state.current + state.reserved < self.max_concurrent
        {
            state.current += 1;
            true
        } else {
            false
        }
    }

    /// Release one in-progress chat slot
    ///
    /// Returns `false` when no chat was in progress.
    pub fn complete_chat(&self) -> bool {
        let mut state = self.lock();
        if state.current > 0 {
            state.current -= 1;
            true
        } else {
            false
        }
    }

    /// Update shift-derived flags, both under one critical section
    pub fn set_shift_flags(&self, active: bool, accepting_new_chats: bool) {
        let mut state = self.lock();
        state.active = active;
        // Off-shift implies not accepting, whatever the caller passed.
        state.accepting_new_chats = active && accepting_new_chats;
    }

    /// Point-in-time copy of the agent for serialization and admin views
    pub fn snapshot(&self) -> AgentSnapshot {
        let state = self.lock();
        AgentSnapshot {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            seniority: self.seniority,
            team: self.team,
            active: state.active,
            accepting_new_chats: state.accepting_new_chats,
            current: state.current,
            reserved: state.reserved,
            max_concurrent: self.max_concurrent,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AgentState> {
        self.state.lock().expect("agent state lock poisoned")
    }
}

/// Serializable point-in-time view of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    /// Stable identifier
    pub id: AgentId,
    /// Human-readable name
    pub display_name: String,
    /// Seniority level
    pub seniority: Seniority,
    /// Team assignment
    pub team: Team,
    /// Inside the shift window
    pub active: bool,
    /// Eligible for new chat assignments
    pub accepting_new_chats: bool,
    /// Chats in progress
    pub current: u32,
    /// Held reservations
    pub reserved: u32,
    /// Concurrent chat limit
    pub max_concurrent: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_agent(seniority: Seniority) -> Agent {
        let agent = Agent::new(
            "a1",
            "Test Agent",
            seniority,
            Team::TeamA,
            ShiftWindow::new((0, 0), (8, 5), ShiftBasis::Utc),
            10,
        );
        agent.set_shift_flags(true, true);
        agent
    }

    #[test]
    fn capacity_follows_multiplier() {
        assert_eq!(test_agent(Seniority::Junior).max_concurrent(), 4);
        assert_eq!(test_agent(Seniority::MidLevel).max_concurrent(), 6);
        assert_eq!(test_agent(Seniority::Senior).max_concurrent(), 8);
        assert_eq!(test_agent(Seniority::TeamLead).max_concurrent(), 5);
    }

    #[test]
    fn reserve_confirm_release_cycle() {
        let agent = test_agent(Seniority::Junior);
        assert!(agent.try_reserve());
        assert_eq!(agent.reserved(), 1);
        assert!(agent.confirm_reservation());
        assert_eq!((agent.current(), agent.reserved()), (1, 0));

        assert!(agent.try_reserve());
        agent.release_reservation();
        assert_eq!((agent.current(), agent.reserved()), (1, 0));

        // Release with nothing held stays a no-op.
        agent.release_reservation();
        assert_eq!(agent.reserved(), 0);
    }

    #[test]
    fn reservations_respect_capacity() {
        let agent = test_agent(Seniority::Junior); // limit 4
        for _ in 0..4 {
            assert!(agent.try_reserve());
        }
        assert!(!agent.try_reserve());
        assert!(!agent.assign_direct());
        assert_eq!(agent.available(), 0);
    }

    #[test]
    fn can_accept_ignores_own_reservation() {
        let agent = test_agent(Seniority::Junior);
        agent.try_reserve();
        agent.try_reserve();
        agent.try_reserve();
        assert!(agent.try_reserve());
        // Full via reservations; no more holds are admitted...
        assert!(!agent.has_open_slot());
        // ...but a holder committing its reservation is still in business.
        assert!(agent.can_accept());
    }

    #[test]
    fn off_shift_agents_take_nothing() {
        let agent = test_agent(Seniority::Senior);
        agent.set_shift_flags(false, true);
        assert!(!agent.try_reserve());
        assert!(!agent.assign_direct());
        assert!(!agent.is_accepting_new_chats());
    }

    #[test]
    fn complete_chat_floors_at_zero() {
        let agent = test_agent(Seniority::MidLevel);
        assert!(!agent.complete_chat());
        assert!(agent.assign_direct());
        assert!(agent.complete_chat());
        assert_eq!(agent.current(), 0);
    }

    #[test]
    fn shift_window_spillover() {
        let window = ShiftWindow::new((15, 55), (24, 5), ShiftBasis::Utc);
        assert!(window.contains(23 * 60));
        assert!(window.contains(0));
        assert!(window.contains(5));
        assert!(!window.contains(6));
        assert_eq!(window.minutes_until_end(23 * 60), 65);
        assert_eq!(window.minutes_until_end(2), 3);
    }
}
