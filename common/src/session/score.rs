#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Participant {
    One,
    Two,
}

/// Wins per participant and draws for the current mode. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub participant_one_wins: u32,
    pub participant_two_wins: u32,
    pub draws: u32,
}

impl ScoreTally {
    pub fn record_win(&mut self, participant: Participant) {
        match participant {
            Participant::One => self.participant_one_wins += 1,
            Participant::Two => self.participant_two_wins += 1,
        }
    }

    pub fn record_draw(&mut self) {
        self.draws += 1;
    }

    pub fn games_played(&self) -> u32 {
        self.participant_one_wins + self.participant_two_wins + self.draws
    }
}
