//! Console command parser
//!
//! One command per line, case-insensitive keywords:
//! `start`, `stop`, `phase <id>`, `threshold <n>`, `adjust <phase> <n>`,
//! `calibrate`, `energy <x>`, `chime on|off`, `reflect <text>`,
//! `sessions`, `status`, `help`, `quit`.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Phase, ReasonCode};

lazy_static! {
    static ref RE_BARE: Regex = Regex::new(
        r"(?i)^(start|stop|calibrate|status|sessions|help|quit|exit)$"
    ).unwrap();

    static ref RE_PHASE: Regex = Regex::new(r"(?i)^phase\s+(\S+)$").unwrap();

    static ref RE_THRESHOLD: Regex = Regex::new(
        r"(?i)^threshold\s+(-?\d+(?:\.\d+)?)$"
    ).unwrap();

    static ref RE_ADJUST: Regex = Regex::new(
        r"(?i)^adjust\s+(\S+)\s+([+-]?\d+)$"
    ).unwrap();

    static ref RE_ENERGY: Regex = Regex::new(
        r"(?i)^energy\s+(\d+(?:\.\d+)?(?:e-?\d+)?)$"
    ).unwrap();

    static ref RE_CHIME: Regex = Regex::new(r"(?i)^chime\s+(on|off)$").unwrap();

    static ref RE_REFLECT: Regex = Regex::new(r"(?is)^reflect\s+(.+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Phase(Phase),
    Threshold(f64),
    Adjust(Phase, i32),
    Calibrate,
    Energy(f64),
    Chime(bool),
    Reflect(String),
    Sessions,
    Status,
    Help,
    Quit,
}

impl Command {
    pub const USAGE: &'static str = "\
start | stop | phase <none|lecture|quiet|discussion> | threshold <0-100>
adjust <phase> <offset> | calibrate | energy <raw> | chime on|off
reflect <text> | sessions | status | help | quit";
}

impl FromStr for Command {
    type Err = ReasonCode;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();

        if let Some(caps) = RE_BARE.captures(line) {
            return Ok(match caps[1].to_lowercase().as_str() {
                "start" => Command::Start,
                "stop" => Command::Stop,
                "calibrate" => Command::Calibrate,
                "status" => Command::Status,
                "sessions" => Command::Sessions,
                "help" => Command::Help,
                _ => Command::Quit,
            });
        }
        if let Some(caps) = RE_PHASE.captures(line) {
            return Ok(Command::Phase(caps[1].parse()?));
        }
        if let Some(caps) = RE_THRESHOLD.captures(line) {
            let value = caps[1]
                .parse()
                .map_err(|_| ReasonCode::M301_INVALID_THRESHOLD)?;
            return Ok(Command::Threshold(value));
        }
        if let Some(caps) = RE_ADJUST.captures(line) {
            let phase: Phase = caps[1].parse()?;
            let offset = caps[2]
                .parse()
                .map_err(|_| ReasonCode::M305_INVALID_COMMAND)?;
            return Ok(Command::Adjust(phase, offset));
        }
        if let Some(caps) = RE_ENERGY.captures(line) {
            let value = caps[1]
                .parse()
                .map_err(|_| ReasonCode::M305_INVALID_COMMAND)?;
            return Ok(Command::Energy(value));
        }
        if let Some(caps) = RE_CHIME.captures(line) {
            return Ok(Command::Chime(caps[1].eq_ignore_ascii_case("on")));
        }
        if let Some(caps) = RE_REFLECT.captures(line) {
            return Ok(Command::Reflect(caps[1].trim().to_string()));
        }
        Err(ReasonCode::M305_INVALID_COMMAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_commands() {
        assert_eq!("start".parse(), Ok(Command::Start));
        assert_eq!("  STOP ".parse(), Ok(Command::Stop));
        assert_eq!("exit".parse(), Ok(Command::Quit));
        assert_eq!("calibrate".parse(), Ok(Command::Calibrate));
    }

    #[test]
    fn test_phase_command() {
        assert_eq!("phase quiet".parse(), Ok(Command::Phase(Phase::Quiet)));
        assert_eq!("Phase Discussion".parse(), Ok(Command::Phase(Phase::Discussion)));
        assert_eq!("phase recess".parse::<Command>(), Err(ReasonCode::M302_UNKNOWN_PHASE));
    }

    #[test]
    fn test_numeric_commands() {
        assert_eq!("threshold 58.5".parse(), Ok(Command::Threshold(58.5)));
        assert_eq!("adjust discussion -5".parse(), Ok(Command::Adjust(Phase::Discussion, -5)));
        assert_eq!("adjust quiet +3".parse(), Ok(Command::Adjust(Phase::Quiet, 3)));
        assert_eq!("energy 0.002".parse(), Ok(Command::Energy(0.002)));
        assert_eq!("energy 1e-3".parse(), Ok(Command::Energy(0.001)));
    }

    #[test]
    fn test_text_commands() {
        assert_eq!("chime ON".parse(), Ok(Command::Chime(true)));
        assert_eq!(
            "reflect Calm after lunch".parse(),
            Ok(Command::Reflect("Calm after lunch".to_string()))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!("".parse::<Command>(), Err(ReasonCode::M305_INVALID_COMMAND));
        assert_eq!("threshold loud".parse::<Command>(), Err(ReasonCode::M305_INVALID_COMMAND));
        assert_eq!("startle".parse::<Command>(), Err(ReasonCode::M305_INVALID_COMMAND));
    }
}
