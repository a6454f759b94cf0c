//! Warning chime gate with cooldown

/// Decides when an over-threshold tick may trigger a chime
#[derive(Debug, Clone)]
pub struct WarningGate {
    enabled: bool,
    cooldown_ms: u64,
    last_ms: Option<u64>,
}

impl WarningGate {
    pub fn new(enabled: bool, cooldown_ms: u64) -> Self {
        Self {
            enabled,
            cooldown_ms,
            last_ms: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// True (and arms the cooldown) if a warning may fire now
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(last) = self.last_ms {
            if now_ms.saturating_sub(last) < self.cooldown_ms {
                return false;
            }
        }
        self.last_ms = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_fires() {
        let mut gate = WarningGate::new(false, 5000);
        assert!(!gate.try_fire(0));
    }

    #[test]
    fn test_cooldown() {
        let mut gate = WarningGate::new(true, 5000);
        assert!(gate.try_fire(1000));
        assert!(!gate.try_fire(3000));
        assert!(!gate.try_fire(5999));
        assert!(gate.try_fire(6000));
    }
}
