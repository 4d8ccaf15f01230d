//! Swap flows across both simulated ledgers.

#[cfg(test)]
mod harness;

mod flows;
mod resilience;
mod safety;
