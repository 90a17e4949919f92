use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use inkspace_sdk::prelude::*;
use inkspace_sdk::SyncState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

const ROOM: &str = "stress";
const ALPHABET: &[char] = &['a', 'b', 'c', 'x', 'y', 'z', ' ', 'é', 'ß', '字'];

/// Parameters of one convergence run.
#[derive(Clone, Debug)]
pub struct StressConfig {
    pub clients: usize,
    pub edits_per_client: usize,
    /// Share of scheduler steps spent delivering messages rather than editing.
    pub delivery_ratio: f64,
    /// Fixed seed for a reproducible schedule.
    pub seed: Option<u64>,
    pub initial_text: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            clients: 4,
            edits_per_client: 100,
            delivery_ratio: 0.6,
            seed: None,
            initial_text: String::from("The quick brown fox"),
        }
    }
}

/// Statistics collected during a run
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub clients: usize,
    pub edits_per_client: usize,
    pub local_edits: usize,
    pub messages_delivered: usize,
    pub final_revision: u64,
    pub final_length: usize,
    pub total_time: Duration,
    pub avg_delivery_time: Duration,
    pub ops_per_second: f64,
    pub converged: bool,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Convergence Test Statistics                   ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Clients:                   {:>30} ║", self.clients);
        println!("║  Edits per Client:          {:>30} ║", self.edits_per_client);
        println!("║  Local Edits Submitted:     {:>30} ║", self.local_edits);
        println!("║  Messages Delivered:        {:>30} ║", self.messages_delivered);
        println!("║  Final Revision:            {:>30} ║", self.final_revision);
        println!("║  Final Length (chars):      {:>30} ║", self.final_length);
        println!("║  Total Time:                {:>29}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Delivery Time:     {:>28}µs ║", format!("{:.2}", self.avg_delivery_time.as_micros()));
        println!("║  Operations/Second:         {:>30.0} ║", self.ops_per_second);
        println!("║  Converged:                 {:>30} ║", if self.converged { "yes" } else { "NO" });
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// One scheduler decision.
#[derive(Clone, Copy, Debug)]
enum Step {
    Edit(usize),
    Upload(usize),
    Download(usize),
}

struct Replica {
    id: ClientId,
    session: Session<MemoryTransport>,
    outbound: UnboundedReceiver<ClientMessage>,
    inbound: UnboundedReceiver<ServerMessage>,
    edits_left: usize,
}

/// Generator that yields an interleaving of edits and message deliveries
fn schedule(config: &StressConfig, seed: u64) -> impl Stream<Item = Step> {
    let clients = config.clients;
    let delivery_ratio = config.delivery_ratio.clamp(0.0, 1.0);
    let steps = config.clients * config.edits_per_client * 4;
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..steps {
            let replica = rng.gen_range(0..clients);
            if rng.gen_bool(delivery_ratio) {
                if rng.gen_bool(0.5) {
                    yield Step::Upload(replica);
                } else {
                    yield Step::Download(replica);
                }
            } else {
                yield Step::Edit(replica);
            }
        }
    }
}

/// Produce a random edit of `content`: insert, delete or replace a short run.
fn random_edit(rng: &mut StdRng, content: &str) -> String {
    let mut chars: Vec<char> = content.chars().collect();
    let at = rng.gen_range(0..=chars.len());
    let run: String = (0..rng.gen_range(1..4))
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect();

    match rng.gen_range(0..3) {
        0 => {
            chars.splice(at..at, run.chars());
        }
        1 if !chars.is_empty() => {
            let at = at.min(chars.len() - 1);
            let end = (at + rng.gen_range(1..4)).min(chars.len());
            chars.drain(at..end);
        }
        _ => {
            let end = (at + rng.gen_range(0..3)).min(chars.len());
            chars.splice(at..end, run.chars());
        }
    }
    chars.into_iter().collect()
}

fn connect(manager: &RoomManager, edits: usize) -> Result<Replica, SdkError> {
    let (transport, outbound) = MemoryTransport::new();
    let (sink, inbound) = mpsc::unbounded_channel();
    let id = manager.connect(sink);
    let config = SessionConfigBuilder::new().room_id(ROOM).build();
    let session = Session::new(Arc::new(transport), config);
    session.join()?;
    Ok(Replica {
        id,
        session,
        outbound,
        inbound,
        edits_left: edits,
    })
}

/// Move one message from a replica to the authority, through JSON.
fn upload(manager: &RoomManager, replica: &mut Replica) -> Result<bool, SdkError> {
    let Ok(message) = replica.outbound.try_recv() else {
        return Ok(false);
    };
    let message = ClientMessage::from_json(&message.to_json()?)?;
    manager.handle(replica.id, message)?;
    Ok(true)
}

/// Move one message from the authority to a replica, through JSON.
fn download(replica: &mut Replica) -> Result<bool, SdkError> {
    let Ok(message) = replica.inbound.try_recv() else {
        return Ok(false);
    };
    let message = ServerMessage::from_json(&message.to_json()?)?;
    replica.session.handle_message(message)?;
    Ok(true)
}

/// Deliver everything in flight until every queue is empty.
async fn flush(
    manager: &RoomManager,
    replicas: &mut [Replica],
    delivery_times: &mut Vec<Duration>,
) -> Result<(), SdkError> {
    loop {
        let mut moved = false;
        for replica in replicas.iter_mut() {
            loop {
                let start = Instant::now();
                let delivered = upload(manager, replica)? || download(replica)?;
                if !delivered {
                    break;
                }
                delivery_times.push(start.elapsed());
                moved = true;
            }
        }
        if !moved {
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
}

/// Run N sessions against one authority with randomized edits and
/// randomized delivery, then check that every replica converged.
pub async fn stress_test_convergence(config: StressConfig) -> Result<StressTestStats, SdkError> {
    let seed = config.seed.unwrap_or_else(|| StdRng::from_entropy().gen());
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        OT Convergence Test (Async)                         ║");
    println!("║  Clients: {} | Edits/Client: {} | Seed: {} ",
             config.clients, config.edits_per_client, seed);
    println!("╚════════════════════════════════════════════════════════════╝");
    info!(clients = config.clients, seed, "starting convergence run");

    let start = Instant::now();
    let manager = RoomManager::new();
    manager.open_room(ROOM, &config.initial_text);

    let mut replicas = Vec::with_capacity(config.clients);
    for _ in 0..config.clients {
        replicas.push(connect(&manager, config.edits_per_client)?);
    }
    let mut delivery_times = Vec::new();
    flush(&manager, &mut replicas, &mut delivery_times).await?;

    println!("\n[Phase 1/2] Editing with interleaved delivery...");

    let mut rng = StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut steps = Box::pin(schedule(&config, seed));
    let mut local_edits = 0;
    let mut step_count = 0usize;

    while let Some(step) = steps.next().await {
        step_count += 1;
        match step {
            Step::Edit(index) => {
                let replica = &mut replicas[index];
                if replica.edits_left == 0 {
                    continue;
                }
                let content = replica.session.content().unwrap_or_default().to_string();
                let edited = random_edit(&mut rng, &content);
                replica.session.on_content_change(&edited)?;
                replica.edits_left -= 1;
                local_edits += 1;
            }
            Step::Upload(index) => {
                let begin = Instant::now();
                if upload(&manager, &mut replicas[index])? {
                    delivery_times.push(begin.elapsed());
                }
            }
            Step::Download(index) => {
                let begin = Instant::now();
                if download(&mut replicas[index])? {
                    delivery_times.push(begin.elapsed());
                }
            }
        }

        if step_count % 100 == 0 {
            tokio::task::yield_now().await;
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Draining in-flight messages...");

    // Replicas that were scheduled too rarely still owe their edits.
    for index in 0..replicas.len() {
        while replicas[index].edits_left > 0 {
            let replica = &mut replicas[index];
            let content = replica.session.content().unwrap_or_default().to_string();
            let edited = random_edit(&mut rng, &content);
            replica.session.on_content_change(&edited)?;
            replica.edits_left -= 1;
            local_edits += 1;
            flush(&manager, &mut replicas, &mut delivery_times).await?;
        }
    }
    flush(&manager, &mut replicas, &mut delivery_times).await?;

    let total_time = start.elapsed();
    let (state, revision) = manager
        .room(ROOM)
        .map(|room| {
            let room = room.read();
            (room.state().to_string(), room.revision())
        })
        .ok_or_else(|| SdkError::RoomNotFound(ROOM.to_string()))?;

    let mut converged = true;
    for replica in &replicas {
        let content = replica.session.content().unwrap_or_default();
        let idle = replica
            .session
            .client()
            .map(|client| client.state() == SyncState::Idle)
            .unwrap_or(false);
        if content != state || !idle {
            warn!(client_id = replica.id, idle, "replica diverged");
            converged = false;
        } else {
            debug!(client_id = replica.id, "replica converged");
        }
    }

    println!("[Phase 2/2] ✓ Completed");

    let avg_delivery_time = if !delivery_times.is_empty() {
        delivery_times.iter().sum::<Duration>() / delivery_times.len() as u32
    } else {
        Duration::ZERO
    };
    let total_operations = local_edits + delivery_times.len();

    Ok(StressTestStats {
        clients: config.clients,
        edits_per_client: config.edits_per_client,
        local_edits,
        messages_delivered: delivery_times.len(),
        final_revision: revision,
        final_length: state.chars().count(),
        total_time,
        avg_delivery_time,
        ops_per_second: total_operations as f64 / total_time.as_secs_f64(),
        converged,
    })
}

/// Convergence runs at a growing number of clients
pub async fn stress_test_scaling(
    max_clients: usize,
    step_size: usize,
) -> Result<Vec<StressTestStats>, SdkError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Convergence vs Clients             ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut all = Vec::new();
    let mut clients = step_size.max(1);
    while clients <= max_clients {
        let stats = stress_test_convergence(StressConfig {
            clients,
            edits_per_client: 50,
            ..StressConfig::default()
        })
        .await?;
        stats.print();
        all.push(stats);
        clients += step_size.max(1);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_small_run_converges() {
        let stats = stress_test_convergence(StressConfig {
            clients: 3,
            edits_per_client: 30,
            seed: Some(7),
            ..StressConfig::default()
        })
        .await
        .unwrap();

        assert!(stats.converged);
        assert_eq!(stats.local_edits, 90);
    }

    #[tokio::test]
    async fn test_delivery_only_after_edits() {
        let stats = stress_test_convergence(StressConfig {
            clients: 2,
            edits_per_client: 20,
            delivery_ratio: 0.0,
            seed: Some(11),
            initial_text: String::new(),
        })
        .await
        .unwrap();

        assert!(stats.converged);
    }

    #[test]
    fn test_random_edit_changes_text() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let edited = random_edit(&mut rng, "");
            assert!(!edited.is_empty());
        }
    }
}
