//! Simulated bot opponents
//!
//! A waiting player who is not paired within the long-wait threshold gets a
//! bot opponent. The bot answers every round after a random delay.

pub mod simulator;

pub use simulator::BotSimulator;
