//! `roomline` CLI — inspect availability and exercise bookings against a
//! JSON scenario file.
//!
//! ## Usage
//!
//! ```sh
//! # Free slots for a room on a date
//! roomline slots -s scenario.json --room studio-a --date 2026-09-14
//!
//! # Bookable durations at a start instant
//! roomline durations -s scenario.json --room studio-a --start 2026-09-14T18:00:00Z
//!
//! # Conflict check for a candidate interval
//! roomline check -s scenario.json --room studio-a \
//!     --start 2026-09-14T10:00:00Z --end 2026-09-14T11:00:00Z
//!
//! # Create a booking (policy + conflict validation)
//! roomline book -s scenario.json --room studio-a --user ada \
//!     --start 2026-09-14T13:00:00Z --minutes 90 --now 2026-09-14T08:00:00Z
//! ```
//!
//! The scenario file carries rooms, the policy catalog, and any seed
//! bookings. Instants are RFC 3339; dates are calendar dates in the room's
//! timezone.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use roomline_engine::conflict::find_conflicts;
use roomline_engine::engine::{BookingEngine, BookingRequest};
use roomline_engine::model::{Booking, BookingState, Room, RoomId, UserId};
use roomline_engine::policy::PolicyCatalog;
use roomline_engine::store::{BookingStore, MemoryStore};

#[derive(Parser)]
#[command(
    name = "roomline",
    version,
    about = "Room reservation engine scenario runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List free slots for a room on a date
    Slots {
        /// Scenario file (rooms, policies, seed bookings)
        #[arg(short, long)]
        scenario: String,
        #[arg(long)]
        room: String,
        /// Calendar date in the room's timezone (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Resolve policy for this user's overrides
        #[arg(long)]
        user: Option<String>,
    },
    /// List bookable durations at a start instant
    Durations {
        #[arg(short, long)]
        scenario: String,
        #[arg(long)]
        room: String,
        /// Start instant, RFC 3339 (e.g. 2026-09-14T18:00:00Z)
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Check a candidate interval for conflicts
    Check {
        #[arg(short, long)]
        scenario: String,
        #[arg(long)]
        room: String,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Create a booking through full policy and conflict validation
    Book {
        #[arg(short, long)]
        scenario: String,
        #[arg(long)]
        room: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        start: DateTime<Utc>,
        /// Duration in minutes (half-hour grid)
        #[arg(long)]
        minutes: i64,
        /// Clock to validate notice/horizon against (defaults to the real now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        #[arg(long)]
        notes: Option<String>,
    },
}

/// A seed booking in a scenario file; priced at zero and scheduled unless a
/// state is given.
#[derive(Debug, Deserialize)]
struct SeedBooking {
    room: String,
    user: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default = "default_state")]
    state: BookingState,
}

fn default_state() -> BookingState {
    BookingState::Scheduled
}

#[derive(Debug, Deserialize)]
struct Scenario {
    rooms: Vec<Room>,
    policies: PolicyCatalog,
    #[serde(default)]
    bookings: Vec<SeedBooking>,
}

fn load_engine(path: &str) -> Result<BookingEngine<MemoryStore>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("Invalid scenario file: {}", path))?;

    let store = MemoryStore::new();
    let seeds: Vec<Booking> = scenario
        .bookings
        .into_iter()
        .map(|seed| Booking {
            id: roomline_engine::model::BookingId(0),
            room: RoomId::new(seed.room),
            user: UserId::new(seed.user),
            start: seed.start,
            end: seed.end,
            state: seed.state,
            price_cents: 0,
            created_at: seed.start,
            notes: None,
            confirmation_deadline: Some(seed.start),
            confirmed_at: None,
            checked_in_at: None,
            checked_out_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            no_show_notes: None,
            version: 0,
        })
        .collect();
    store.seed(seeds).context("Failed to seed bookings")?;

    Ok(BookingEngine::new(scenario.rooms, scenario.policies, store))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Slots {
            scenario,
            room,
            date,
            user,
        } => {
            let engine = load_engine(&scenario)?;
            let room_id = RoomId::new(room);
            let user = user.map(UserId::new);
            let tz = engine.room(&room_id)?.timezone;
            let slots = engine.free_slots(&room_id, date, user.as_ref())?;

            if slots.is_empty() {
                println!("No free slots on {}", date);
            }
            for slot in slots {
                println!(
                    "{} - {}  ({})",
                    slot.start.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
                    slot.end.with_timezone(&tz).format("%H:%M"),
                    roomline_engine::durations::duration_label(slot.duration_minutes),
                );
            }
        }
        Commands::Durations {
            scenario,
            room,
            start,
            user,
        } => {
            let engine = load_engine(&scenario)?;
            let user = user.map(UserId::new);
            let options = engine.available_durations(&RoomId::new(room), start, user.as_ref())?;

            if options.is_empty() {
                println!("No bookable durations at {}", start.to_rfc3339());
            }
            for (minutes, label) in options {
                println!("{:>4} min  {}", minutes, label);
            }
        }
        Commands::Check {
            scenario,
            room,
            start,
            end,
        } => {
            if end <= start {
                bail!("--end must be after --start");
            }
            let engine = load_engine(&scenario)?;
            let room_id = RoomId::new(room);
            engine.room(&room_id)?;
            let bookings = engine.store().for_room_overlapping(&room_id, start, end)?;
            let conflicts = find_conflicts(&bookings, start, end);

            if conflicts.is_empty() {
                println!("available");
            } else {
                for c in &conflicts {
                    println!(
                        "conflict with booking {} ({} minutes overlap)",
                        c.booking, c.overlap_minutes
                    );
                }
                std::process::exit(1);
            }
        }
        Commands::Book {
            scenario,
            room,
            user,
            start,
            minutes,
            now,
            notes,
        } => {
            let engine = load_engine(&scenario)?;
            let request = BookingRequest {
                room: RoomId::new(room),
                user: UserId::new(user),
                start,
                duration_minutes: minutes,
                notes,
            };
            let now = now.unwrap_or_else(Utc::now);
            match engine.create_booking(&request, now) {
                Ok(booking) => {
                    println!(
                        "booked {}: {} for {} ({} cents)",
                        booking.id,
                        booking.start.to_rfc3339(),
                        roomline_engine::durations::duration_label(booking.duration_minutes()),
                        booking.price_cents,
                    );
                }
                Err(err) => {
                    eprintln!("rejected: {}", err);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
