use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Timelike;
use structopt::StructOpt;

use hccs::collective::alltoall::all_to_all;
use hccs::collective::task::TaskDataType;
use hccs::comm::{Communicator, CommunicatorId};
use hccs::config::CommConfig;
use hccs::device::alloc::DeviceMemory;
use hccs::device::ptr::DevicePtr;
use hccs::device::stream::Stream;
use hccs::transport::fabric::{Fabric, SharedFabric};

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "AllToAll Benchmark")]
struct Opts {
    #[structopt(long, default_value = "2")]
    num_nodes: usize,
    #[structopt(long, default_value = "2")]
    local_ranks: usize,
    /// elements exchanged between each rank pair
    #[structopt(long, default_value = "4096")]
    count: usize,
    #[structopt(long, default_value = "20")]
    round: usize,
    #[structopt(short, long)]
    config: Option<PathBuf>,
}

struct Participant {
    comm: Communicator,
    stream: Stream,
    sendbuff: DevicePtr,
    recvbuff: DevicePtr,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let time = chrono::Local::now();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}.{:03} {} {}] {}",
                time.hour() % 24,
                time.minute(),
                time.second(),
                time.timestamp_subsec_millis(),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let opts = Opts::from_args();
    let config = match &opts.config {
        Some(path) => match CommConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => CommConfig::default(),
    };

    let num_ranks = opts.num_nodes * opts.local_ranks;
    let block_bytes = opts.count * TaskDataType::Int32.count_bytes();
    let buffer_bytes = num_ranks * block_bytes;
    log::info!(
        "all-to-all over {} nodes x {} local ranks, {} bytes per rank pair, {} channels",
        opts.num_nodes,
        opts.local_ranks,
        block_bytes,
        config.channel_count
    );

    let fabric = SharedFabric::new(num_ranks);
    let participants: Vec<Participant> = (0..num_ranks)
        .map(|rank| {
            let f: Arc<dyn Fabric> = fabric.clone();
            Participant {
                comm: Communicator::new(
                    CommunicatorId(42),
                    rank,
                    opts.num_nodes,
                    opts.local_ranks,
                    config.channel_count,
                    f,
                ),
                stream: Stream::new(),
                sendbuff: DevicePtr::new(&DeviceMemory::alloc(buffer_bytes)),
                recvbuff: DevicePtr::new(&DeviceMemory::alloc(buffer_bytes)),
            }
        })
        .collect();

    let mut elapsed = Duration::ZERO;
    for round in 0..opts.round {
        for (rank, p) in participants.iter().enumerate() {
            let vals: Vec<u8> = (0..num_ranks)
                .flat_map(|dest| {
                    let v = (rank * num_ranks + dest) as i32;
                    std::iter::repeat(v.to_le_bytes()).take(opts.count).flatten()
                })
                .collect();
            p.sendbuff.write_bytes(&vals).unwrap();
        }

        let start = Instant::now();
        for p in &participants {
            if let Err(e) = all_to_all(
                &p.sendbuff,
                &p.recvbuff,
                opts.count,
                TaskDataType::Int32,
                &p.comm,
                &p.stream,
            ) {
                log::error!("round {}: {}", round, e);
                return ExitCode::FAILURE;
            }
        }
        for p in &participants {
            if let Err(e) = p.stream.synchronize() {
                log::error!("round {}: {}", round, e);
                return ExitCode::FAILURE;
            }
        }
        elapsed += start.elapsed();

        if round == 0 {
            for (rank, p) in participants.iter().enumerate() {
                let got = p.recvbuff.read_bytes(buffer_bytes).unwrap();
                for sender in 0..num_ranks {
                    let expected = ((sender * num_ranks + rank) as i32).to_le_bytes();
                    let block = &got[sender * block_bytes..(sender + 1) * block_bytes];
                    if block.chunks_exact(4).any(|c| c != &expected[..]) {
                        log::error!("rank {}: block {} corrupt", rank, sender);
                        return ExitCode::FAILURE;
                    }
                }
            }
            log::info!("verification passed");
        }
    }

    let per_round = elapsed / opts.round as u32;
    let moved_bytes = (num_ranks * num_ranks) as u128 * block_bytes as u128;
    let gbps = moved_bytes as f64 / per_round.as_secs_f64() / 1e9;
    log::info!(
        "{} rounds, {:?} per round, {:.3} GB/s aggregate, {} transfers posted",
        opts.round,
        per_round,
        gbps,
        fabric.transfers_posted()
    );
    ExitCode::SUCCESS
}
