use crate::config::HarvestSettings;

/// Why a harvesting session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of links was reached.
    TargetReached,
    /// Too many consecutive rounds produced no new links.
    Converged,
    /// The round ceiling was hit before either other condition.
    RoundLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundDecision {
    /// Trigger more lazy loading and run another round.
    Continue,
    Stop(StopReason),
}

/// Pure convergence tracker for one harvesting session.
///
/// The harvester reports the outcome of every discovery round; the tracker
/// decides whether to scroll again or stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestProgress {
    max_rounds: u32,
    stagnant_limit: u32,
    target: Option<usize>,
    rounds: u32,
    stagnant_rounds: u32,
}

impl HarvestProgress {
    pub fn new(settings: &HarvestSettings, target: Option<usize>) -> Self {
        Self {
            max_rounds: settings.max_rounds,
            stagnant_limit: settings.stagnant_round_limit,
            target,
            rounds: 0,
            stagnant_rounds: 0,
        }
    }

    /// Applies one completed round: `new_links` were added, giving `total`.
    pub fn observe(&mut self, new_links: usize, total: usize) -> RoundDecision {
        self.rounds += 1;
        if new_links == 0 {
            self.stagnant_rounds += 1;
        } else {
            self.stagnant_rounds = 0;
        }

        if self.target.is_some_and(|target| total >= target) {
            return RoundDecision::Stop(StopReason::TargetReached);
        }
        if self.stagnant_rounds >= self.stagnant_limit {
            return RoundDecision::Stop(StopReason::Converged);
        }
        if self.rounds >= self.max_rounds {
            return RoundDecision::Stop(StopReason::RoundLimit);
        }
        RoundDecision::Continue
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn stagnant_rounds(&self) -> u32 {
        self.stagnant_rounds
    }
}
