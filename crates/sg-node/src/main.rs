use clap::Parser;
use serde_json::json;
use sg_node::cli::{Cli, Command};
use sg_node::GraphContainer;
use sg_07_ingest::IngestOptions;
use sg_telemetry::TelemetryConfig;
use tracing::error;

fn main() {
    let cli = Cli::parse();
    let telemetry_config = TelemetryConfig { json_logs: cli.json, ..TelemetryConfig::from_env() };
    let _telemetry = match sg_telemetry::init_telemetry(telemetry_config) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: telemetry init failed: {err}");
            None
        }
    };

    if let Err(err) = run(cli) {
        error!(%err, "sg-node command failed");
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), sg_types::GraphError> {
    let container = GraphContainer::open(&cli.data_dir)?;

    match cli.command {
        Command::Init => {
            println!("initialized data directory at {}", cli.data_dir.display());
            println!("node id: {}", container.node_id());
        }

        Command::Ingest { file, tags, source_type } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| sg_types::GraphError::StorageFailure(e.to_string()))?;
            let options = IngestOptions { tags, source_type, ..IngestOptions::default() };
            let outcome = container.ingest(&content, &options)?;
            print_ingest_outcome(&outcome, cli.json);
        }

        Command::IngestText { content, tags, source_type } => {
            let options = IngestOptions { tags, source_type, ..IngestOptions::default() };
            let outcome = container.ingest(&content, &options)?;
            print_ingest_outcome(&outcome, cli.json);
        }

        Command::Search { query, top_k } => {
            let hits = container.search(&query, top_k)?;
            if cli.json {
                let rows: Vec<_> = hits
                    .iter()
                    .map(|h| json!({"neuronId": h.neuron_id, "score": h.score, "content": h.content, "sourceType": h.source_type, "tags": h.tags}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows).unwrap());
            } else {
                for hit in &hits {
                    println!("{:.4}  {}  {}", hit.score, hit.neuron_id, truncate(&hit.content, 80));
                }
            }
        }

        Command::Verify { id } => match id {
            Some(id) => {
                let ok = container.verify(id)?;
                println!("{id}: {}", if ok { "ok" } else { "MISMATCH" });
                if !ok {
                    std::process::exit(1);
                }
            }
            None => {
                let results = container.verify_all()?;
                let bad: Vec<_> = results.iter().filter(|(_, ok)| !ok).collect();
                for (id, ok) in &results {
                    println!("{id}: {}", if *ok { "ok" } else { "MISMATCH" });
                }
                if !bad.is_empty() {
                    std::process::exit(1);
                }
            }
        },

        Command::List => {
            for id in container.list_ids()? {
                println!("{id}");
            }
        }

        Command::Get { id } => match container.get_neuron(id)? {
            Some(neuron) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&neuron).unwrap());
                } else {
                    println!("id: {}", neuron.id);
                    println!("merkle root: {}", neuron.merkle_root.to_hex());
                    println!("chunks: {}", neuron.chunk_hashes.len());
                    println!("tags: {:?}", neuron.metadata.tags);
                }
            }
            None => return Err(sg_types::GraphError::NotFound(id.to_string())),
        },

        Command::Stats { metrics } => {
            let stats = container.stats()?;
            println!("node id: {}", stats.node_id);
            println!("neurons: {}", stats.neuron_count);
            println!("journal entries: {}", stats.journal_entries);
            if metrics {
                println!("{}", container.render_metrics()?);
            }
        }

        Command::Connect { peer_data_dir } => {
            let report = container.connect(peer_data_dir)?;
            println!("applied: {}", report.applied.len());
            println!("conflicts resolved: {}", report.conflicts_resolved);
            if !report.skipped.is_empty() {
                println!("skipped:");
                for (id, reason) in &report.skipped {
                    println!("  {id}: {reason}");
                }
            }
        }

        Command::Compact => {
            let report = container.compact_once()?;
            println!("tombstones removed: {}", report.tombstones_removed);
            println!("chunks removed: {}", report.chunks_removed);
            println!("journal entries removed: {}", report.journal_entries_removed);
        }
    }

    Ok(())
}

fn print_ingest_outcome(outcome: &sg_07_ingest::IngestOutcome, json: bool) {
    if json {
        let row = json!({
            "neuronId": outcome.neuron.id,
            "deduped": outcome.deduped,
            "synapsesFormed": outcome.synapses_formed,
        });
        println!("{}", serde_json::to_string_pretty(&row).unwrap());
    } else {
        println!("neuron: {}", outcome.neuron.id);
        println!("deduped: {}", outcome.deduped);
        println!("synapses formed: {}", outcome.synapses_formed);
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
