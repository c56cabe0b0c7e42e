//! # Identity & Role Registry
//!
//! Tracks registered participants and their roles. Every authorization
//! check downstream goes through [`ParticipantRegistry::require_active`] or
//! [`ParticipantRegistry::require_role`].
//!
//! Participants are never deleted. Deactivation clears the active flag; a
//! deactivated principal may register again, which replaces the record with
//! a fresh one (new name, location, role, starting reputation).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agri_core::{LedgerError, Principal, Role, Timestamp};

/// A registered party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity key.
    pub principal: Principal,
    /// Display name.
    pub name: String,
    /// Free-form location.
    pub location: String,
    /// Role chosen at registration.
    pub role: Role,
    /// Cleared by deactivation.
    pub active: bool,
    /// Administrative reputation score.
    pub reputation: u32,
    /// When the current record was created.
    pub registered_at: Timestamp,
}

/// The participant table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRegistry {
    participants: BTreeMap<Principal, Participant>,
}

impl ParticipantRegistry {
    /// Look up a participant record, active or not.
    pub fn get(&self, principal: &Principal) -> Option<&Participant> {
        self.participants.get(principal)
    }

    /// Whether `principal` is registered and active.
    pub fn is_active(&self, principal: &Principal) -> bool {
        self.get(principal).is_some_and(|p| p.active)
    }

    /// The role `principal` registered with, if it ever registered.
    pub fn role_of(&self, principal: &Principal) -> Option<Role> {
        self.get(principal).map(|p| p.role)
    }

    /// All participants in principal order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Number of participants ever registered.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Require that `principal` is registered and active.
    pub fn require_active(&self, principal: &Principal) -> Result<&Participant, LedgerError> {
        match self.get(principal) {
            Some(p) if p.active => Ok(p),
            Some(_) => Err(LedgerError::Unauthorized(format!(
                "{principal} has been deactivated"
            ))),
            None => Err(LedgerError::Unauthorized(format!(
                "{principal} is not a registered participant"
            ))),
        }
    }

    /// Require that `principal` is registered with `role`.
    pub fn require_role(&self, principal: &Principal, role: Role) -> Result<&Participant, LedgerError> {
        let participant = self.get(principal).ok_or_else(|| {
            LedgerError::Unauthorized(format!("{principal} is not a registered participant"))
        })?;
        if participant.role != role {
            return Err(LedgerError::Unauthorized(format!(
                "{principal} has role {}, {role} required",
                participant.role
            )));
        }
        Ok(participant)
    }

    pub(crate) fn register(
        &mut self,
        principal: Principal,
        name: String,
        location: String,
        role: Role,
        starting_reputation: u32,
        now: Timestamp,
    ) -> Result<&Participant, LedgerError> {
        if self.is_active(&principal) {
            return Err(LedgerError::AlreadyRegistered(principal.to_string()));
        }
        require_text("name", &name)?;
        require_text("location", &location)?;

        let participant = Participant {
            principal: principal.clone(),
            name,
            location,
            role,
            active: true,
            reputation: starting_reputation,
            registered_at: now,
        };
        self.participants.insert(principal.clone(), participant);
        Ok(&self.participants[&principal])
    }

    pub(crate) fn set_reputation(
        &mut self,
        principal: &Principal,
        reputation: u32,
    ) -> Result<(), LedgerError> {
        let participant = self
            .participants
            .get_mut(principal)
            .ok_or_else(|| LedgerError::NotFound(format!("participant {principal}")))?;
        if !participant.active {
            return Err(LedgerError::InactiveParticipant(principal.to_string()));
        }
        participant.reputation = reputation;
        Ok(())
    }

    pub(crate) fn deactivate(&mut self, principal: &Principal) -> Result<(), LedgerError> {
        let participant = self
            .participants
            .get_mut(principal)
            .ok_or_else(|| LedgerError::NotFound(format!("participant {principal}")))?;
        if !participant.active {
            return Err(LedgerError::InactiveParticipant(principal.to_string()));
        }
        participant.active = false;
        Ok(())
    }
}

/// Reject empty or all-whitespace required text.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::ErrorKind;

    fn p(key: &str) -> Principal {
        Principal::new(key).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-04-01T06:00:00Z").unwrap()
    }

    fn registry_with(key: &str, role: Role) -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::default();
        registry
            .register(p(key), "Name".into(), "Somewhere".into(), role, 100, now())
            .unwrap();
        registry
    }

    #[test]
    fn test_register_creates_active_participant() {
        let registry = registry_with("farm-a", Role::Producer);
        let farm = registry.get(&p("farm-a")).unwrap();
        assert!(farm.active);
        assert_eq!(farm.reputation, 100);
        assert_eq!(registry.role_of(&p("farm-a")), Some(Role::Producer));
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut registry = registry_with("farm-a", Role::Producer);
        let err = registry
            .register(p("farm-a"), "Again".into(), "Here".into(), Role::Retailer, 100, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
        assert_eq!(registry.role_of(&p("farm-a")), Some(Role::Producer));
    }

    #[test]
    fn test_register_requires_name_and_location() {
        let mut registry = ParticipantRegistry::default();
        let err = registry
            .register(p("x"), "".into(), "Here".into(), Role::Retailer, 100, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = registry
            .register(p("x"), "X".into(), "  ".into(), Role::Retailer, 100, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregister_after_deactivation() {
        let mut registry = registry_with("shop", Role::Retailer);
        registry.deactivate(&p("shop")).unwrap();
        registry
            .register(p("shop"), "Shop 2".into(), "Town".into(), Role::Distributor, 100, now())
            .unwrap();
        assert!(registry.is_active(&p("shop")));
        assert_eq!(registry.role_of(&p("shop")), Some(Role::Distributor));
    }

    #[test]
    fn test_require_active_and_role() {
        let mut registry = registry_with("farm-a", Role::Producer);
        assert!(registry.require_active(&p("farm-a")).is_ok());
        assert!(registry.require_role(&p("farm-a"), Role::Producer).is_ok());
        assert_eq!(
            registry.require_role(&p("farm-a"), Role::Retailer).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            registry.require_active(&p("ghost")).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        registry.deactivate(&p("farm-a")).unwrap();
        assert_eq!(
            registry.require_active(&p("farm-a")).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_set_reputation() {
        let mut registry = registry_with("farm-a", Role::Producer);
        registry.set_reputation(&p("farm-a"), 7).unwrap();
        assert_eq!(registry.get(&p("farm-a")).unwrap().reputation, 7);
        assert_eq!(
            registry.set_reputation(&p("ghost"), 1).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        registry.deactivate(&p("farm-a")).unwrap();
        assert_eq!(
            registry.set_reputation(&p("farm-a"), 1).unwrap_err().kind(),
            ErrorKind::InactiveParticipant
        );
    }

    #[test]
    fn test_deactivate() {
        let mut registry = registry_with("farm-a", Role::Producer);
        assert_eq!(
            registry.deactivate(&p("ghost")).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        registry.deactivate(&p("farm-a")).unwrap();
        assert!(!registry.is_active(&p("farm-a")));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.deactivate(&p("farm-a")).unwrap_err().kind(),
            ErrorKind::InactiveParticipant
        );
    }
}
