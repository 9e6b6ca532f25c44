//! Wallet session state.
//!
//! Approval/session state is owned by one `SessionSlot` and passed to
//! consumers explicitly. A context is created on wallet connect and
//! cleared on disconnect or address change; nothing persists beyond the
//! session. No key material is held here; signing belongs to an external
//! collaborator, this only tracks addresses and the approval flag.

use chrono::{DateTime, Utc};

/// Session state for one connected wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: String,
    agent_address: Option<String>,
    builder_approved: bool,
    created_at: DateTime<Utc>,
}

impl SessionContext {
    /// New context for a freshly connected wallet.
    pub fn connect(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            agent_address: None,
            builder_approved: false,
            created_at: Utc::now(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Address comparison is case-insensitive (hex addresses).
    pub fn matches_user(&self, addr: &str) -> bool {
        self.user.eq_ignore_ascii_case(addr)
    }

    pub fn agent_address(&self) -> Option<&str> {
        self.agent_address.as_deref()
    }

    /// Record the approved agent address for this session.
    pub fn set_agent_address(&mut self, addr: impl Into<String>) {
        self.agent_address = Some(addr.into());
    }

    pub fn is_builder_approved(&self) -> bool {
        self.builder_approved
    }

    pub fn set_builder_approved(&mut self, approved: bool) {
        self.builder_approved = approved;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Owner of the at-most-one active session.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<SessionContext>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a wallet. Reconnecting with a different address replaces the
    /// context (and so drops agent/approval state); reconnecting with the
    /// same address keeps it.
    pub fn connect(&mut self, user: &str) -> &SessionContext {
        if let Some(ctx) = &self.current {
            if !ctx.matches_user(user) {
                self.current = None;
            }
        }
        self.current
            .get_or_insert_with(|| SessionContext::connect(user))
    }

    /// Disconnect, dropping all session state.
    pub fn disconnect(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&SessionContext> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut SessionContext> {
        self.current.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_creates_context() {
        let mut slot = SessionSlot::new();
        assert!(slot.current().is_none());

        slot.connect("0xAbC1");
        let ctx = slot.current().unwrap();
        assert_eq!(ctx.user(), "0xAbC1");
        assert!(!ctx.is_builder_approved());
        assert!(ctx.agent_address().is_none());
    }

    #[test]
    fn test_address_change_clears_state() {
        let mut slot = SessionSlot::new();
        slot.connect("0xaaaa");
        {
            let ctx = slot.current_mut().unwrap();
            ctx.set_builder_approved(true);
            ctx.set_agent_address("0xagent");
        }

        slot.connect("0xbbbb");
        let ctx = slot.current().unwrap();
        assert_eq!(ctx.user(), "0xbbbb");
        assert!(!ctx.is_builder_approved());
        assert!(ctx.agent_address().is_none());
    }

    #[test]
    fn test_same_address_keeps_state() {
        let mut slot = SessionSlot::new();
        slot.connect("0xAAAA");
        slot.current_mut().unwrap().set_builder_approved(true);

        // Same address, different case: same session
        slot.connect("0xaaaa");
        assert!(slot.current().unwrap().is_builder_approved());
    }

    #[test]
    fn test_disconnect_drops_everything() {
        let mut slot = SessionSlot::new();
        slot.connect("0xaaaa");
        slot.disconnect();
        assert!(slot.current().is_none());
    }
}
