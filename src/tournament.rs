// Tournament lifecycle: escrowed prize pools, registration windows,
// percentage distribution, refund-safe cancellation.
// Status machine: Registration -> Active -> {Completed, Cancelled},
// plus Registration -> Cancelled. Nothing else.
// Same ordering discipline as the marketplace:
// validate -> debit -> local effects -> credits -> events.

use crate::event::{AccountId, EventLog, EventRecord};
use crate::transfer::{TransferError, ValueTransfer};
use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TournamentError {
    InvalidId,
    TournamentExists,
    TournamentNotFound,
    NeedAtLeastTwoParticipants,
    InvalidRegistrationPeriod,
    RegistrationMustEndBeforeStart,
    AmountNotPositive,
    NotAuthorized,
    MustTotal100,
    CannotModify,
    NotInRegistration,
    RegistrationNotOpen,
    RegistrationClosed,
    TournamentFull,
    AlreadyRegistered,
    CannotAddToPool,
    NotStartTimeYet,
    NotEnoughParticipants,
    InvalidStatus,
    NotActive,
    FirstNotParticipant,
    SecondNotParticipant,
    ThirdNotParticipant,
    CannotCancel,
    Transfer(TransferError),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::TournamentNotFound => ErrorKind::NotFound,
            TournamentError::NotAuthorized => ErrorKind::Unauthorized,
            TournamentError::CannotModify
            | TournamentError::NotInRegistration
            | TournamentError::RegistrationNotOpen
            | TournamentError::RegistrationClosed
            | TournamentError::AlreadyRegistered
            | TournamentError::CannotAddToPool
            | TournamentError::NotStartTimeYet
            | TournamentError::NotEnoughParticipants
            | TournamentError::InvalidStatus
            | TournamentError::NotActive
            | TournamentError::CannotCancel => ErrorKind::InvalidState,
            TournamentError::InvalidId
            | TournamentError::TournamentExists
            | TournamentError::NeedAtLeastTwoParticipants
            | TournamentError::InvalidRegistrationPeriod
            | TournamentError::RegistrationMustEndBeforeStart
            | TournamentError::AmountNotPositive
            | TournamentError::MustTotal100
            | TournamentError::FirstNotParticipant
            | TournamentError::SecondNotParticipant
            | TournamentError::ThirdNotParticipant => ErrorKind::InvalidInput,
            TournamentError::TournamentFull => ErrorKind::ResourceExhausted,
            TournamentError::Transfer(_) => ErrorKind::TransferFailed,
        }
    }
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InvalidId => write!(f, "id must be a non-empty string"),
            TournamentError::TournamentExists => write!(f, "tournament id already taken"),
            TournamentError::TournamentNotFound => write!(f, "tournament not found"),
            TournamentError::NeedAtLeastTwoParticipants => {
                write!(f, "max participants must be at least 2")
            }
            TournamentError::InvalidRegistrationPeriod => {
                write!(f, "registration must open before it closes")
            }
            TournamentError::RegistrationMustEndBeforeStart => {
                write!(f, "registration must close before the start time")
            }
            TournamentError::AmountNotPositive => write!(f, "amount must be positive"),
            TournamentError::NotAuthorized => write!(f, "caller is not sponsor or admin"),
            TournamentError::MustTotal100 => write!(f, "distribution must total exactly 100"),
            TournamentError::CannotModify => {
                write!(f, "distribution is frozen outside registration")
            }
            TournamentError::NotInRegistration => write!(f, "tournament is not in registration"),
            TournamentError::RegistrationNotOpen => write!(f, "registration has not opened yet"),
            TournamentError::RegistrationClosed => write!(f, "registration has closed"),
            TournamentError::TournamentFull => write!(f, "tournament is full"),
            TournamentError::AlreadyRegistered => write!(f, "player already registered"),
            TournamentError::CannotAddToPool => {
                write!(f, "prize pool is frozen outside registration")
            }
            TournamentError::NotStartTimeYet => write!(f, "start time has not been reached"),
            TournamentError::NotEnoughParticipants => {
                write!(f, "at least 2 participants required")
            }
            TournamentError::InvalidStatus => write!(f, "operation invalid in current status"),
            TournamentError::NotActive => write!(f, "tournament is not active"),
            TournamentError::FirstNotParticipant => {
                write!(f, "first place is not a registered participant")
            }
            TournamentError::SecondNotParticipant => {
                write!(f, "second place is not a registered participant")
            }
            TournamentError::ThirdNotParticipant => {
                write!(f, "third place is not a registered participant")
            }
            TournamentError::CannotCancel => write!(f, "tournament already reached a terminal state"),
            TournamentError::Transfer(e) => write!(f, "transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TournamentError {}

impl From<TransferError> for TournamentError {
    fn from(e: TransferError) -> Self {
        TournamentError::Transfer(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentKind {
    PlatformSponsored,
    CreatorSponsored,
    CommunitySponsored,
}

impl TournamentKind {
    pub fn name(&self) -> &'static str {
        match self {
            TournamentKind::PlatformSponsored => "PlatformSponsored",
            TournamentKind::CreatorSponsored => "CreatorSponsored",
            TournamentKind::CommunitySponsored => "CommunitySponsored",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    Registration,
    Active,
    Completed,
    Cancelled,
}

/// Four-way percentage split of the prize pool. Must total exactly 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub first: u8,
    pub second: u8,
    pub third: u8,
    pub participation: u8,
}

impl Distribution {
    pub fn total(&self) -> u32 {
        u32::from(self.first)
            + u32::from(self.second)
            + u32::from(self.third)
            + u32::from(self.participation)
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution {
            first: 50,
            second: 25,
            third: 15,
            participation: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub player: AccountId,
    pub entry_fee_paid: u64,
    pub registered_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winners {
    pub first: AccountId,
    pub second: AccountId,
    pub third: AccountId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub game_id: String,
    pub sponsor: AccountId,
    pub kind: TournamentKind,
    pub status: TournamentStatus,
    /// Live escrow; drains to zero at a terminal state.
    pub prize_pool: u64,
    pub entry_fee: u64,
    pub max_participants: u32,
    pub registration_start: u64,
    pub registration_end: u64,
    pub start_time: u64,
    /// Entry fees held outside the pool (non-community kinds).
    pub entry_fees_accumulated: u64,
    pub participants: Vec<Participant>,
    pub winners: Option<Winners>,
    pub distribution: Distribution,
    pub created_at: u64,
}

impl Tournament {
    pub fn current_participants(&self) -> u32 {
        self.participants.len() as u32
    }

    fn is_participant(&self, player: &AccountId) -> bool {
        self.participants.iter().any(|p| p.player == *player)
    }
}

/// Creation parameters shared by all three sponsorship kinds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TournamentParams {
    pub id: String,
    pub game_id: String,
    pub prize_pool: u64,
    pub entry_fee: u64,
    pub max_participants: u32,
    pub registration_start: u64,
    pub registration_end: u64,
    pub start_time: u64,
}

pub(crate) struct PayoutPlan {
    pub first: u64,
    pub second: u64,
    pub third: u64,
    pub participation_each: u64,
    pub non_winners: Vec<AccountId>,
}

/// Splits `pool` per the distribution. Every unit stranded by truncation
/// (the percentage floors and the participation division), and the whole
/// participation pool when nobody is left outside the podium, lands on the
/// first-place payout, so the credited total equals `pool` exactly.
pub(crate) fn payout_plan(
    pool: u64,
    dist: &Distribution,
    participants: &[Participant],
    winners: &Winners,
) -> PayoutPlan {
    let pct = |p: u8| ((u128::from(pool) * u128::from(p)) / 100) as u64;
    let mut first = pct(dist.first);
    let second = pct(dist.second);
    let third = pct(dist.third);
    let participation_pool = pool - first - second - third;

    let non_winners: Vec<AccountId> = participants
        .iter()
        .map(|p| p.player)
        .filter(|p| *p != winners.first && *p != winners.second && *p != winners.third)
        .collect();

    let participation_each = if non_winners.is_empty() {
        first += participation_pool;
        0
    } else {
        let n = non_winners.len() as u64;
        let each = participation_pool / n;
        first += participation_pool - each * n;
        each
    };

    PayoutPlan {
        first,
        second,
        third,
        participation_each,
        non_winners,
    }
}

#[derive(Clone, Debug, Default)]
pub struct TournamentLedger {
    tournaments: HashMap<String, Tournament>,
}

impl TournamentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared creation path. The sponsor funds `prize_pool` by
    /// debit-into-escrow; only community tournaments may start at zero.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        kind: TournamentKind,
        sponsor: AccountId,
        params: TournamentParams,
        default_distribution: Distribution,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
        now: u64,
    ) -> Result<(), TournamentError> {
        if params.id.is_empty() {
            return Err(TournamentError::InvalidId);
        }
        if self.tournaments.contains_key(&params.id) {
            return Err(TournamentError::TournamentExists);
        }
        if params.max_participants < 2 {
            return Err(TournamentError::NeedAtLeastTwoParticipants);
        }
        if params.registration_start >= params.registration_end {
            return Err(TournamentError::InvalidRegistrationPeriod);
        }
        if params.registration_end > params.start_time {
            return Err(TournamentError::RegistrationMustEndBeforeStart);
        }
        if kind != TournamentKind::CommunitySponsored && params.prize_pool == 0 {
            return Err(TournamentError::AmountNotPositive);
        }

        bank.debit(sponsor, params.prize_pool)?;

        let tournament = Tournament {
            id: params.id.clone(),
            game_id: params.game_id.clone(),
            sponsor,
            kind,
            status: TournamentStatus::Registration,
            prize_pool: params.prize_pool,
            entry_fee: params.entry_fee,
            max_participants: params.max_participants,
            registration_start: params.registration_start,
            registration_end: params.registration_end,
            start_time: params.start_time,
            entry_fees_accumulated: 0,
            participants: Vec::new(),
            winners: None,
            distribution: default_distribution,
            created_at: now,
        };
        events.append(EventRecord::TournamentCreated {
            tournament_id: tournament.id.clone(),
            game_id: tournament.game_id.clone(),
            sponsor,
            kind: kind.name().to_string(),
            prize_pool: tournament.prize_pool,
            entry_fee: tournament.entry_fee,
            max_participants: tournament.max_participants,
        });
        self.tournaments.insert(params.id, tournament);
        Ok(())
    }

    pub fn set_distribution(
        &mut self,
        id: &str,
        first: u8,
        second: u8,
        third: u8,
        participation: u8,
        caller: AccountId,
        is_admin: bool,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get_mut(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if !is_admin && caller != t.sponsor {
            return Err(TournamentError::NotAuthorized);
        }
        let candidate = Distribution {
            first,
            second,
            third,
            participation,
        };
        if candidate.total() != 100 {
            return Err(TournamentError::MustTotal100);
        }
        if t.status != TournamentStatus::Registration {
            return Err(TournamentError::CannotModify);
        }
        t.distribution = candidate;
        Ok(())
    }

    pub fn register(
        &mut self,
        id: &str,
        player: AccountId,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
        now: u64,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get_mut(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if t.status != TournamentStatus::Registration {
            return Err(TournamentError::NotInRegistration);
        }
        if now < t.registration_start {
            return Err(TournamentError::RegistrationNotOpen);
        }
        if now > t.registration_end {
            return Err(TournamentError::RegistrationClosed);
        }
        if t.current_participants() >= t.max_participants {
            return Err(TournamentError::TournamentFull);
        }
        if t.is_participant(&player) {
            return Err(TournamentError::AlreadyRegistered);
        }

        bank.debit(player, t.entry_fee)?;

        // Community pools absorb fees directly; other kinds hold them aside.
        if t.kind == TournamentKind::CommunitySponsored {
            t.prize_pool = t.prize_pool.saturating_add(t.entry_fee);
        } else {
            t.entry_fees_accumulated = t.entry_fees_accumulated.saturating_add(t.entry_fee);
        }
        t.participants.push(Participant {
            player,
            entry_fee_paid: t.entry_fee,
            registered_at: now,
        });
        events.append(EventRecord::ParticipantRegistered {
            tournament_id: id.to_string(),
            player,
            entry_fee: t.entry_fee,
        });
        Ok(())
    }

    /// Open to any caller during registration.
    pub fn add_to_prize_pool(
        &mut self,
        id: &str,
        amount: u64,
        caller: AccountId,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get_mut(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if t.status != TournamentStatus::Registration {
            return Err(TournamentError::CannotAddToPool);
        }
        if amount == 0 {
            return Err(TournamentError::AmountNotPositive);
        }

        bank.debit(caller, amount)?;
        t.prize_pool = t.prize_pool.saturating_add(amount);
        events.append(EventRecord::PrizePoolIncreased {
            tournament_id: id.to_string(),
            contributor: caller,
            amount,
        });
        Ok(())
    }

    pub fn start(
        &mut self,
        id: &str,
        caller: AccountId,
        is_admin: bool,
        events: &mut EventLog,
        now: u64,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get_mut(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if t.status != TournamentStatus::Registration {
            return Err(TournamentError::InvalidStatus);
        }
        if !is_admin && caller != t.sponsor {
            return Err(TournamentError::NotAuthorized);
        }
        if now < t.start_time {
            return Err(TournamentError::NotStartTimeYet);
        }
        if t.current_participants() < 2 {
            return Err(TournamentError::NotEnoughParticipants);
        }

        t.status = TournamentStatus::Active;
        let count = t.current_participants();
        events.append(EventRecord::TournamentStarted {
            tournament_id: id.to_string(),
            participant_count: count,
            timestamp: now,
        });
        Ok(())
    }

    /// Distribute the escrowed pool to three named winners (which need not be
    /// distinct) and the registered non-winners, then release held entry fees
    /// to the sponsor. Drains escrow to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn complete(
        &mut self,
        id: &str,
        first: AccountId,
        second: AccountId,
        third: AccountId,
        caller: AccountId,
        is_admin: bool,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
        now: u64,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if t.status != TournamentStatus::Active {
            return Err(TournamentError::NotActive);
        }
        if !is_admin && caller != t.sponsor {
            return Err(TournamentError::NotAuthorized);
        }
        if !t.is_participant(&first) {
            return Err(TournamentError::FirstNotParticipant);
        }
        if !t.is_participant(&second) {
            return Err(TournamentError::SecondNotParticipant);
        }
        if !t.is_participant(&third) {
            return Err(TournamentError::ThirdNotParticipant);
        }

        let winners = Winners {
            first,
            second,
            third,
        };
        let plan = payout_plan(t.prize_pool, &t.distribution, &t.participants, &winners);
        let fees_release = if t.kind == TournamentKind::CommunitySponsored {
            0
        } else {
            t.entry_fees_accumulated
        };
        let sponsor = t.sponsor;

        // --- local effects; escrow bookkeeping drains before payouts ---
        let t = self.tournaments.get_mut(id).expect("checked above");
        t.status = TournamentStatus::Completed;
        t.winners = Some(winners);
        t.prize_pool = 0;
        t.entry_fees_accumulated = 0;

        // --- credits ---
        bank.credit(first, plan.first)?;
        bank.credit(second, plan.second)?;
        bank.credit(third, plan.third)?;
        for player in &plan.non_winners {
            bank.credit(*player, plan.participation_each)?;
        }
        if fees_release > 0 {
            bank.credit(sponsor, fees_release)?;
        }

        // --- events ---
        for (place, winner, amount) in [
            (1u8, first, plan.first),
            (2u8, second, plan.second),
            (3u8, third, plan.third),
        ] {
            events.append(EventRecord::PrizeDistributed {
                tournament_id: id.to_string(),
                winner,
                place,
                amount,
            });
        }
        for player in &plan.non_winners {
            events.append(EventRecord::ParticipationRewardDistributed {
                tournament_id: id.to_string(),
                participant: *player,
                amount: plan.participation_each,
            });
        }
        if fees_release > 0 {
            events.append(EventRecord::EntryFeesReleased {
                tournament_id: id.to_string(),
                sponsor,
                amount: fees_release,
            });
        }
        events.append(EventRecord::TournamentCompleted {
            tournament_id: id.to_string(),
            first,
            second,
            third,
            timestamp: now,
        });
        Ok(())
    }

    /// Refund every participant their exact paid fee. Non-community pools
    /// return to the sponsor in full; community pools, net of the refunds,
    /// are swept to the treasury (top-ups carry no contributor claim).
    #[allow(clippy::too_many_arguments)]
    pub fn cancel(
        &mut self,
        id: &str,
        reason: &str,
        caller: AccountId,
        is_admin: bool,
        treasury: AccountId,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
        now: u64,
    ) -> Result<(), TournamentError> {
        let t = self
            .tournaments
            .get(id)
            .ok_or(TournamentError::TournamentNotFound)?;
        if matches!(
            t.status,
            TournamentStatus::Completed | TournamentStatus::Cancelled
        ) {
            return Err(TournamentError::CannotCancel);
        }
        if !is_admin && caller != t.sponsor {
            return Err(TournamentError::NotAuthorized);
        }

        let refunds: Vec<(AccountId, u64)> = t
            .participants
            .iter()
            .map(|p| (p.player, p.entry_fee_paid))
            .collect();
        let total_refunds: u64 = refunds.iter().map(|(_, amount)| *amount).sum();
        let (sponsor_refund, forfeited) = match t.kind {
            TournamentKind::CommunitySponsored => {
                (0, t.prize_pool.saturating_sub(total_refunds))
            }
            _ => (t.prize_pool, 0),
        };
        let sponsor = t.sponsor;

        // --- local effects ---
        let t = self.tournaments.get_mut(id).expect("checked above");
        t.status = TournamentStatus::Cancelled;
        t.prize_pool = 0;
        t.entry_fees_accumulated = 0;

        // --- credits ---
        for (player, amount) in &refunds {
            bank.credit(*player, *amount)?;
        }
        if sponsor_refund > 0 {
            bank.credit(sponsor, sponsor_refund)?;
        }
        if forfeited > 0 {
            bank.credit(treasury, forfeited)?;
        }

        // --- events ---
        for (player, amount) in &refunds {
            events.append(EventRecord::RefundIssued {
                tournament_id: id.to_string(),
                participant: *player,
                amount: *amount,
            });
        }
        if sponsor_refund > 0 {
            events.append(EventRecord::SponsorRefunded {
                tournament_id: id.to_string(),
                sponsor,
                amount: sponsor_refund,
            });
        }
        if forfeited > 0 {
            events.append(EventRecord::PoolForfeited {
                tournament_id: id.to_string(),
                amount: forfeited,
            });
        }
        events.append(EventRecord::TournamentCancelled {
            tournament_id: id.to_string(),
            reason: reason.to_string(),
            timestamp: now,
        });
        Ok(())
    }

    // --- read accessors (side-effect free) ---

    pub fn tournament(&self, id: &str) -> Option<&Tournament> {
        self.tournaments.get(id)
    }

    pub fn participants(&self, id: &str) -> Option<&[Participant]> {
        self.tournaments.get(id).map(|t| t.participants.as_slice())
    }

    /// None before completion.
    pub fn winners(&self, id: &str) -> Option<&Winners> {
        self.tournaments.get(id).and_then(|t| t.winners.as_ref())
    }

    pub fn distribution(&self, id: &str) -> Option<&Distribution> {
        self.tournaments.get(id).map(|t| &t.distribution)
    }

    pub fn participant_entry_fees(&self, id: &str, player: AccountId) -> Option<u64> {
        self.tournaments.get(id).and_then(|t| {
            t.participants
                .iter()
                .find(|p| p.player == player)
                .map(|p| p.entry_fee_paid)
        })
    }

    // --- snapshot plumbing (sorted for deterministic output) ---

    pub(crate) fn export_tournaments(&self) -> Vec<Tournament> {
        let mut tournaments: Vec<Tournament> = self.tournaments.values().cloned().collect();
        tournaments.sort_by(|a, b| a.id.cmp(&b.id));
        tournaments
    }

    pub(crate) fn from_parts(tournaments: Vec<Tournament>) -> Self {
        let mut ledger = Self::new();
        for t in tournaments {
            ledger.tournaments.insert(t.id.clone(), t);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::InMemoryBank;

    const SPONSOR: AccountId = [0x50; 32];
    const TREASURY: AccountId = [0xEE; 32];

    fn player(seed: u8) -> AccountId {
        [seed; 32]
    }

    fn participant(seed: u8) -> Participant {
        Participant {
            player: player(seed),
            entry_fee_paid: 0,
            registered_at: 0,
        }
    }

    fn params(id: &str) -> TournamentParams {
        TournamentParams {
            id: id.to_string(),
            game_id: "quest".to_string(),
            prize_pool: 10_000,
            entry_fee: 100,
            max_participants: 8,
            registration_start: 1_000,
            registration_end: 2_000,
            start_time: 3_000,
        }
    }

    fn ledger_with(
        kind: TournamentKind,
        p: TournamentParams,
        bank: &mut InMemoryBank,
        events: &mut EventLog,
    ) -> TournamentLedger {
        let mut ledger = TournamentLedger::new();
        ledger
            .create(kind, SPONSOR, p, Distribution::default(), bank, events, 500)
            .expect("create");
        ledger
    }

    #[test]
    fn default_distribution_pays_spec_example() {
        // pool 10000, 4 participants, 3 distinct winners -> 5000/2500/1500,
        // and the lone non-winner takes the remaining 1000 exactly.
        let participants: Vec<Participant> = (1..=4).map(participant).collect();
        let winners = Winners {
            first: player(1),
            second: player(2),
            third: player(3),
        };
        let plan = payout_plan(10_000, &Distribution::default(), &participants, &winners);
        assert_eq!(plan.first, 5_000);
        assert_eq!(plan.second, 2_500);
        assert_eq!(plan.third, 1_500);
        assert_eq!(plan.non_winners, vec![player(4)]);
        assert_eq!(plan.participation_each, 1_000);
    }

    #[test]
    fn payout_remainders_land_on_first_place() {
        // 33/33/33/1 of 100 strands one unit in the percentage floors and the
        // participation division; first place absorbs it.
        let participants: Vec<Participant> = (1..=5).map(participant).collect();
        let winners = Winners {
            first: player(1),
            second: player(2),
            third: player(3),
        };
        let dist = Distribution {
            first: 33,
            second: 33,
            third: 33,
            participation: 1,
        };
        let plan = payout_plan(100, &dist, &participants, &winners);
        assert_eq!(plan.second, 33);
        assert_eq!(plan.third, 33);
        assert_eq!(plan.participation_each, 0);
        // 33 + the stranded participation unit
        assert_eq!(plan.first, 34);
        let total = plan.first
            + plan.second
            + plan.third
            + plan.participation_each * plan.non_winners.len() as u64;
        assert_eq!(total, 100);
    }

    #[test]
    fn payout_sum_equals_pool_across_odd_cases() {
        let winners = Winners {
            first: player(1),
            second: player(2),
            third: player(3),
        };
        for (pool, n) in [(9_999u64, 7u8), (101, 4), (1, 3), (12_345, 11)] {
            let participants: Vec<Participant> = (1..=n).map(participant).collect();
            let plan = payout_plan(pool, &Distribution::default(), &participants, &winners);
            let total = plan.first
                + plan.second
                + plan.third
                + plan.participation_each * plan.non_winners.len() as u64;
            assert_eq!(total, pool, "pool {} with {} entrants", pool, n);
        }
    }

    #[test]
    fn no_non_winners_sends_participation_pool_to_first() {
        let participants: Vec<Participant> = (1..=3).map(participant).collect();
        let winners = Winners {
            first: player(1),
            second: player(2),
            third: player(3),
        };
        let plan = payout_plan(10_000, &Distribution::default(), &participants, &winners);
        assert_eq!(plan.first, 6_000);
        assert!(plan.non_winners.is_empty());
    }

    #[test]
    fn create_validates_shape_and_funds_escrow() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 50_000)]);
        let mut events = EventLog::new();
        let mut ledger = TournamentLedger::new();

        let mut bad = params("t");
        bad.id = String::new();
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                bad,
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::InvalidId)
        );

        let mut bad = params("t");
        bad.max_participants = 1;
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                bad,
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::NeedAtLeastTwoParticipants)
        );

        let mut bad = params("t");
        bad.registration_start = bad.registration_end;
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                bad,
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::InvalidRegistrationPeriod)
        );

        let mut bad = params("t");
        bad.registration_end = bad.start_time + 1;
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                bad,
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::RegistrationMustEndBeforeStart)
        );

        let mut bad = params("t");
        bad.prize_pool = 0;
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                bad,
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::AmountNotPositive)
        );
        // nothing was escrowed by the failed attempts
        assert_eq!(bank.balance_of(SPONSOR), 50_000);

        ledger
            .create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                params("t"),
                Distribution::default(),
                &mut bank,
                &mut events,
                1,
            )
            .expect("create");
        assert_eq!(bank.balance_of(SPONSOR), 40_000);
        assert_eq!(
            ledger.create(
                TournamentKind::CreatorSponsored,
                SPONSOR,
                params("t"),
                Distribution::default(),
                &mut bank,
                &mut events,
                1
            ),
            Err(TournamentError::TournamentExists)
        );
    }

    #[test]
    fn community_tournaments_may_start_empty() {
        let mut bank = InMemoryBank::new();
        let mut events = EventLog::new();
        let mut ledger = TournamentLedger::new();
        let mut p = params("open");
        p.prize_pool = 0;
        ledger
            .create(
                TournamentKind::CommunitySponsored,
                SPONSOR,
                p,
                Distribution::default(),
                &mut bank,
                &mut events,
                1,
            )
            .expect("zero-pool community create");
    }

    #[test]
    fn registration_window_is_inclusive() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);
        bank.fund(player(2), 1_000);
        bank.fund(player(3), 1_000);

        assert_eq!(
            ledger.register("t", player(1), &mut bank, &mut events, 999),
            Err(TournamentError::RegistrationNotOpen)
        );
        ledger
            .register("t", player(1), &mut bank, &mut events, 1_000)
            .expect("opens at registration_start");
        ledger
            .register("t", player(2), &mut bank, &mut events, 2_000)
            .expect("still open at registration_end");
        assert_eq!(
            ledger.register("t", player(3), &mut bank, &mut events, 2_001),
            Err(TournamentError::RegistrationClosed)
        );
    }

    #[test]
    fn register_rejects_duplicates_and_overflow() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut p = params("t");
        p.max_participants = 2;
        let mut ledger =
            ledger_with(TournamentKind::CreatorSponsored, p, &mut bank, &mut events);
        for seed in 1..=3 {
            bank.fund(player(seed), 1_000);
        }

        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("first");
        assert_eq!(
            ledger.register("t", player(1), &mut bank, &mut events, 1_500),
            Err(TournamentError::AlreadyRegistered)
        );
        ledger
            .register("t", player(2), &mut bank, &mut events, 1_500)
            .expect("second");
        assert_eq!(
            ledger.register("t", player(3), &mut bank, &mut events, 1_500),
            Err(TournamentError::TournamentFull)
        );
        // failed attempts did not debit
        assert_eq!(bank.balance_of(player(3)), 1_000);
    }

    #[test]
    fn community_fees_pool_directly() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CommunitySponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);

        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("register");
        let t = ledger.tournament("t").expect("tournament");
        assert_eq!(t.prize_pool, 10_100);
        assert_eq!(t.entry_fees_accumulated, 0);
    }

    #[test]
    fn non_community_fees_held_aside() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);

        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("register");
        let t = ledger.tournament("t").expect("tournament");
        assert_eq!(t.prize_pool, 10_000);
        assert_eq!(t.entry_fees_accumulated, 100);
    }

    #[test]
    fn distribution_rules() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );

        assert_eq!(
            ledger.set_distribution("t", 40, 30, 20, 11, SPONSOR, false),
            Err(TournamentError::MustTotal100)
        );
        // unchanged after the failed call
        assert_eq!(
            ledger.distribution("t").copied().expect("distribution"),
            Distribution::default()
        );
        assert_eq!(
            ledger.set_distribution("t", 40, 30, 20, 10, player(9), false),
            Err(TournamentError::NotAuthorized)
        );
        ledger
            .set_distribution("t", 40, 30, 20, 10, SPONSOR, false)
            .expect("sponsor may set");
        ledger
            .set_distribution("t", 70, 20, 5, 5, player(9), true)
            .expect("admin may set");

        // frozen once started
        for seed in 1..=2 {
            bank.fund(player(seed), 1_000);
            ledger
                .register("t", player(seed), &mut bank, &mut events, 1_500)
                .expect("register");
        }
        ledger
            .start("t", SPONSOR, false, &mut events, 3_000)
            .expect("start");
        assert_eq!(
            ledger.set_distribution("t", 40, 30, 20, 10, SPONSOR, false),
            Err(TournamentError::CannotModify)
        );
    }

    #[test]
    fn start_guards() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);
        bank.fund(player(2), 1_000);

        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("one entrant");
        assert_eq!(
            ledger.start("t", SPONSOR, false, &mut events, 3_000),
            Err(TournamentError::NotEnoughParticipants)
        );
        ledger
            .register("t", player(2), &mut bank, &mut events, 1_500)
            .expect("two entrants");
        assert_eq!(
            ledger.start("t", player(1), false, &mut events, 3_000),
            Err(TournamentError::NotAuthorized)
        );
        assert_eq!(
            ledger.start("t", SPONSOR, false, &mut events, 2_999),
            Err(TournamentError::NotStartTimeYet)
        );
        ledger
            .start("t", SPONSOR, false, &mut events, 3_000)
            .expect("start");
        assert_eq!(
            ledger.start("t", SPONSOR, false, &mut events, 3_000),
            Err(TournamentError::InvalidStatus)
        );
    }

    #[test]
    fn two_entrant_field_completes_with_repeated_winner() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut p = params("t");
        p.entry_fee = 0;
        let mut ledger =
            ledger_with(TournamentKind::CreatorSponsored, p, &mut bank, &mut events);
        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("p1");
        ledger
            .register("t", player(2), &mut bank, &mut events, 1_500)
            .expect("p2");
        ledger
            .start("t", SPONSOR, false, &mut events, 3_000)
            .expect("start");
        ledger
            .complete(
                "t",
                player(1),
                player(2),
                player(1),
                SPONSOR,
                false,
                &mut bank,
                &mut events,
                4_000,
            )
            .expect("repeat podium");

        // 50% + 15% + remainder of the empty participation split to player 1,
        // 25% to player 2; the whole pool leaves escrow.
        assert_eq!(bank.balance_of(player(1)), 5_000 + 1_500 + 1_000);
        assert_eq!(bank.balance_of(player(2)), 2_500);
        assert_eq!(ledger.tournament("t").expect("t").prize_pool, 0);
    }

    #[test]
    fn complete_rejects_outsiders_and_wrong_status() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut p = params("t");
        p.entry_fee = 0;
        let mut ledger =
            ledger_with(TournamentKind::CreatorSponsored, p, &mut bank, &mut events);
        for seed in 1..=3 {
            ledger
                .register("t", player(seed), &mut bank, &mut events, 1_500)
                .expect("register");
        }

        assert_eq!(
            ledger.complete(
                "t",
                player(1),
                player(2),
                player(3),
                SPONSOR,
                false,
                &mut bank,
                &mut events,
                4_000
            ),
            Err(TournamentError::NotActive)
        );
        ledger
            .start("t", SPONSOR, false, &mut events, 3_000)
            .expect("start");
        assert_eq!(
            ledger.complete(
                "t",
                player(1),
                player(2),
                player(9),
                SPONSOR,
                false,
                &mut bank,
                &mut events,
                4_000
            ),
            Err(TournamentError::ThirdNotParticipant)
        );
        assert_eq!(
            ledger.complete(
                "t",
                player(1),
                player(2),
                player(3),
                player(1),
                false,
                &mut bank,
                &mut events,
                4_000
            ),
            Err(TournamentError::NotAuthorized)
        );
    }

    #[test]
    fn cancel_refunds_exact_fees_and_pool() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);
        bank.fund(player(2), 1_000);
        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("p1");
        ledger
            .register("t", player(2), &mut bank, &mut events, 1_500)
            .expect("p2");

        ledger
            .cancel(
                "t",
                "rained out",
                SPONSOR,
                false,
                TREASURY,
                &mut bank,
                &mut events,
                1_600,
            )
            .expect("cancel");
        assert_eq!(bank.balance_of(player(1)), 1_000);
        assert_eq!(bank.balance_of(player(2)), 1_000);
        assert_eq!(bank.balance_of(SPONSOR), 10_000);
        assert_eq!(bank.balance_of(TREASURY), 0);
        assert_eq!(
            ledger.tournament("t").expect("t").status,
            TournamentStatus::Cancelled
        );

        // terminal states cannot be cancelled again
        assert_eq!(
            ledger.cancel(
                "t",
                "again",
                SPONSOR,
                false,
                TREASURY,
                &mut bank,
                &mut events,
                1_700
            ),
            Err(TournamentError::CannotCancel)
        );
    }

    #[test]
    fn community_cancel_sweeps_topups_to_treasury() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000), (player(9), 500)]);
        let mut events = EventLog::new();
        let mut ledger = ledger_with(
            TournamentKind::CommunitySponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        bank.fund(player(1), 1_000);
        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("register");
        ledger
            .add_to_prize_pool("t", 500, player(9), &mut bank, &mut events)
            .expect("top-up");

        ledger
            .cancel(
                "t",
                "void",
                SPONSOR,
                false,
                TREASURY,
                &mut bank,
                &mut events,
                1_600,
            )
            .expect("cancel");
        // participant made whole; sponsor seed + donation swept, not returned
        assert_eq!(bank.balance_of(player(1)), 1_000);
        assert_eq!(bank.balance_of(player(9)), 0);
        assert_eq!(bank.balance_of(SPONSOR), 0);
        assert_eq!(bank.balance_of(TREASURY), 10_500);
    }

    #[test]
    fn add_to_pool_requires_registration_status() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000), (player(9), 500)]);
        let mut events = EventLog::new();
        let mut p = params("t");
        p.entry_fee = 0;
        let mut ledger =
            ledger_with(TournamentKind::CreatorSponsored, p, &mut bank, &mut events);

        assert_eq!(
            ledger.add_to_prize_pool("t", 0, player(9), &mut bank, &mut events),
            Err(TournamentError::AmountNotPositive)
        );
        ledger
            .add_to_prize_pool("t", 500, player(9), &mut bank, &mut events)
            .expect("anyone may add");
        assert_eq!(ledger.tournament("t").expect("t").prize_pool, 10_500);

        ledger
            .register("t", player(1), &mut bank, &mut events, 1_500)
            .expect("p1");
        ledger
            .register("t", player(2), &mut bank, &mut events, 1_500)
            .expect("p2");
        ledger
            .start("t", SPONSOR, false, &mut events, 3_000)
            .expect("start");
        assert_eq!(
            ledger.add_to_prize_pool("t", 100, player(9), &mut bank, &mut events),
            Err(TournamentError::CannotAddToPool)
        );
    }

    #[test]
    fn winners_absent_until_completion() {
        let mut bank = InMemoryBank::with_balances(&[(SPONSOR, 10_000)]);
        let mut events = EventLog::new();
        let ledger = ledger_with(
            TournamentKind::CreatorSponsored,
            params("t"),
            &mut bank,
            &mut events,
        );
        assert!(ledger.winners("t").is_none());
        assert_eq!(ledger.participant_entry_fees("t", player(1)), None);
    }
}
