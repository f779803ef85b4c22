// Structured notifications for off-platform indexers.
// Append-only, digest-chained: each sealed entry commits to everything before it.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Caller identity, pre-authenticated by the API layer above this crate.
pub type AccountId = [u8; 32];

/// The null identity; never a valid treasury or caller.
pub const ZERO_ACCOUNT: AccountId = [0u8; 32];

pub type Digest = [u8; 32];

pub const ZERO_DIGEST: Digest = [0u8; 32];

/// One record per mutation kind. Serialized field names are a compatibility
/// surface for downstream consumers; extend, never rename.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum EventRecord {
    GamePublished {
        game_id: String,
        creator: AccountId,
        timestamp: u64,
    },
    GameDeactivated {
        game_id: String,
        timestamp: u64,
    },
    ItemCreated {
        item_id: String,
        game_id: String,
        creator: AccountId,
        price: u64,
        category: String,
        timestamp: u64,
    },
    ItemPurchased {
        item_id: String,
        game_id: String,
        buyer: AccountId,
        price: u64,
        creator_amount: u64,
        platform_amount: u64,
    },
    CreatorPaid {
        item_id: String,
        creator: AccountId,
        amount: u64,
    },
    TreasuryFunded {
        item_id: String,
        amount: u64,
    },
    TournamentCreated {
        tournament_id: String,
        game_id: String,
        sponsor: AccountId,
        #[serde(rename = "type")]
        kind: String,
        prize_pool: u64,
        entry_fee: u64,
        max_participants: u32,
    },
    ParticipantRegistered {
        tournament_id: String,
        player: AccountId,
        entry_fee: u64,
    },
    PrizePoolIncreased {
        tournament_id: String,
        contributor: AccountId,
        amount: u64,
    },
    TournamentStarted {
        tournament_id: String,
        participant_count: u32,
        timestamp: u64,
    },
    PrizeDistributed {
        tournament_id: String,
        winner: AccountId,
        place: u8,
        amount: u64,
    },
    ParticipationRewardDistributed {
        tournament_id: String,
        participant: AccountId,
        amount: u64,
    },
    EntryFeesReleased {
        tournament_id: String,
        sponsor: AccountId,
        amount: u64,
    },
    TournamentCompleted {
        tournament_id: String,
        first: AccountId,
        second: AccountId,
        third: AccountId,
        timestamp: u64,
    },
    RefundIssued {
        tournament_id: String,
        participant: AccountId,
        amount: u64,
    },
    SponsorRefunded {
        tournament_id: String,
        sponsor: AccountId,
        amount: u64,
    },
    PoolForfeited {
        tournament_id: String,
        amount: u64,
    },
    TournamentCancelled {
        tournament_id: String,
        reason: String,
        timestamp: u64,
    },
    TreasuryUpdated {
        previous: AccountId,
        current: AccountId,
        timestamp: u64,
    },
    EnginePaused {
        by: AccountId,
        timestamp: u64,
    },
    EngineUnpaused {
        by: AccountId,
        timestamp: u64,
    },
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_acct(out: &mut Vec<u8>, a: &AccountId) {
    out.extend_from_slice(a);
}

impl EventRecord {
    /// Short stable name of the record kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EventRecord::GamePublished { .. } => "GamePublished",
            EventRecord::GameDeactivated { .. } => "GameDeactivated",
            EventRecord::ItemCreated { .. } => "ItemCreated",
            EventRecord::ItemPurchased { .. } => "ItemPurchased",
            EventRecord::CreatorPaid { .. } => "CreatorPaid",
            EventRecord::TreasuryFunded { .. } => "TreasuryFunded",
            EventRecord::TournamentCreated { .. } => "TournamentCreated",
            EventRecord::ParticipantRegistered { .. } => "ParticipantRegistered",
            EventRecord::PrizePoolIncreased { .. } => "PrizePoolIncreased",
            EventRecord::TournamentStarted { .. } => "TournamentStarted",
            EventRecord::PrizeDistributed { .. } => "PrizeDistributed",
            EventRecord::ParticipationRewardDistributed { .. } => {
                "ParticipationRewardDistributed"
            }
            EventRecord::EntryFeesReleased { .. } => "EntryFeesReleased",
            EventRecord::TournamentCompleted { .. } => "TournamentCompleted",
            EventRecord::RefundIssued { .. } => "RefundIssued",
            EventRecord::SponsorRefunded { .. } => "SponsorRefunded",
            EventRecord::PoolForfeited { .. } => "PoolForfeited",
            EventRecord::TournamentCancelled { .. } => "TournamentCancelled",
            EventRecord::TreasuryUpdated { .. } => "TreasuryUpdated",
            EventRecord::EnginePaused { .. } => "EnginePaused",
            EventRecord::EngineUnpaused { .. } => "EngineUnpaused",
        }
    }

    /// Canonical bytes for digest chaining: tag byte, then fields in
    /// declaration order (length-prefixed strings, little-endian integers).
    pub fn hash_material(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(96);
        match self {
            EventRecord::GamePublished {
                game_id,
                creator,
                timestamp,
            } => {
                out.push(1);
                put_str(&mut out, game_id);
                put_acct(&mut out, creator);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::GameDeactivated { game_id, timestamp } => {
                out.push(2);
                put_str(&mut out, game_id);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::ItemCreated {
                item_id,
                game_id,
                creator,
                price,
                category,
                timestamp,
            } => {
                out.push(3);
                put_str(&mut out, item_id);
                put_str(&mut out, game_id);
                put_acct(&mut out, creator);
                put_u64(&mut out, *price);
                put_str(&mut out, category);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::ItemPurchased {
                item_id,
                game_id,
                buyer,
                price,
                creator_amount,
                platform_amount,
            } => {
                out.push(4);
                put_str(&mut out, item_id);
                put_str(&mut out, game_id);
                put_acct(&mut out, buyer);
                put_u64(&mut out, *price);
                put_u64(&mut out, *creator_amount);
                put_u64(&mut out, *platform_amount);
            }
            EventRecord::CreatorPaid {
                item_id,
                creator,
                amount,
            } => {
                out.push(5);
                put_str(&mut out, item_id);
                put_acct(&mut out, creator);
                put_u64(&mut out, *amount);
            }
            EventRecord::TreasuryFunded { item_id, amount } => {
                out.push(6);
                put_str(&mut out, item_id);
                put_u64(&mut out, *amount);
            }
            EventRecord::TournamentCreated {
                tournament_id,
                game_id,
                sponsor,
                kind,
                prize_pool,
                entry_fee,
                max_participants,
            } => {
                out.push(7);
                put_str(&mut out, tournament_id);
                put_str(&mut out, game_id);
                put_acct(&mut out, sponsor);
                put_str(&mut out, kind);
                put_u64(&mut out, *prize_pool);
                put_u64(&mut out, *entry_fee);
                put_u64(&mut out, u64::from(*max_participants));
            }
            EventRecord::ParticipantRegistered {
                tournament_id,
                player,
                entry_fee,
            } => {
                out.push(8);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, player);
                put_u64(&mut out, *entry_fee);
            }
            EventRecord::PrizePoolIncreased {
                tournament_id,
                contributor,
                amount,
            } => {
                out.push(9);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, contributor);
                put_u64(&mut out, *amount);
            }
            EventRecord::TournamentStarted {
                tournament_id,
                participant_count,
                timestamp,
            } => {
                out.push(10);
                put_str(&mut out, tournament_id);
                put_u64(&mut out, u64::from(*participant_count));
                put_u64(&mut out, *timestamp);
            }
            EventRecord::PrizeDistributed {
                tournament_id,
                winner,
                place,
                amount,
            } => {
                out.push(11);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, winner);
                out.push(*place);
                put_u64(&mut out, *amount);
            }
            EventRecord::ParticipationRewardDistributed {
                tournament_id,
                participant,
                amount,
            } => {
                out.push(12);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, participant);
                put_u64(&mut out, *amount);
            }
            EventRecord::EntryFeesReleased {
                tournament_id,
                sponsor,
                amount,
            } => {
                out.push(13);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, sponsor);
                put_u64(&mut out, *amount);
            }
            EventRecord::TournamentCompleted {
                tournament_id,
                first,
                second,
                third,
                timestamp,
            } => {
                out.push(14);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, first);
                put_acct(&mut out, second);
                put_acct(&mut out, third);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::RefundIssued {
                tournament_id,
                participant,
                amount,
            } => {
                out.push(15);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, participant);
                put_u64(&mut out, *amount);
            }
            EventRecord::SponsorRefunded {
                tournament_id,
                sponsor,
                amount,
            } => {
                out.push(16);
                put_str(&mut out, tournament_id);
                put_acct(&mut out, sponsor);
                put_u64(&mut out, *amount);
            }
            EventRecord::PoolForfeited {
                tournament_id,
                amount,
            } => {
                out.push(17);
                put_str(&mut out, tournament_id);
                put_u64(&mut out, *amount);
            }
            EventRecord::TournamentCancelled {
                tournament_id,
                reason,
                timestamp,
            } => {
                out.push(18);
                put_str(&mut out, tournament_id);
                put_str(&mut out, reason);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::TreasuryUpdated {
                previous,
                current,
                timestamp,
            } => {
                out.push(19);
                put_acct(&mut out, previous);
                put_acct(&mut out, current);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::EnginePaused { by, timestamp } => {
                out.push(20);
                put_acct(&mut out, by);
                put_u64(&mut out, *timestamp);
            }
            EventRecord::EngineUnpaused { by, timestamp } => {
                out.push(21);
                put_acct(&mut out, by);
                put_u64(&mut out, *timestamp);
            }
        }
        out
    }
}

/// A record sealed into the chain: `digest` commits to the previous digest,
/// the sequence number, and the record's canonical bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SealedEvent {
    pub seq: u64,
    pub digest: Digest,
    pub record: EventRecord,
}

#[derive(Clone, Debug)]
pub struct EventLog {
    entries: Vec<SealedEvent>,
    head: Digest,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog {
            entries: Vec::new(),
            head: ZERO_DIGEST,
        }
    }

    fn seal_digest(prev: &Digest, seq: u64, record: &EventRecord) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(prev);
        hasher.update(seq.to_le_bytes());
        hasher.update(record.hash_material());
        hasher.finalize().into()
    }

    pub fn append(&mut self, record: EventRecord) -> &SealedEvent {
        let seq = self.entries.len() as u64;
        let digest = Self::seal_digest(&self.head, seq, &record);
        self.head = digest;
        self.entries.push(SealedEvent {
            seq,
            digest,
            record,
        });
        self.entries.last().expect("just pushed")
    }

    pub fn entries(&self) -> &[SealedEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chain head; commits to the entire log. ZERO_DIGEST iff empty.
    pub fn head_digest(&self) -> Digest {
        self.head
    }

    /// Entries at or after `seq`, for indexer catch-up.
    pub fn since(&self, seq: u64) -> &[SealedEvent] {
        let start = (seq as usize).min(self.entries.len());
        &self.entries[start..]
    }

    /// Re-derive every digest from genesis; false on any mismatch.
    pub fn verify_chain(&self) -> bool {
        let mut prev = ZERO_DIGEST;
        for (i, e) in self.entries.iter().enumerate() {
            if e.seq != i as u64 {
                return false;
            }
            let expected = Self::seal_digest(&prev, e.seq, &e.record);
            if e.digest != expected {
                return false;
            }
            prev = expected;
        }
        prev == self.head
    }

    /// Rebuild a log from persisted entries, rejecting a broken chain.
    pub fn from_entries(entries: Vec<SealedEvent>) -> Result<Self, String> {
        let head = entries.last().map(|e| e.digest).unwrap_or(ZERO_DIGEST);
        let log = EventLog { entries, head };
        if !log.verify_chain() {
            return Err("event chain digest mismatch".into());
        }
        Ok(log)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
