use anyhow::Result;
use warcsift::{
    config::Config,
    pipeline::{GroupPaths, OutputCommit, OutputState, ProgressStore},
    util::truncate_str,
};

pub fn show_status(config: Config, group: usize) -> Result<()> {
    let commit = OutputCommit::new(GroupPaths::new(
        &config.output.destination,
        group,
        &config.output.extension,
    ));
    let paths = commit.paths();

    println!("\nGroup {}", group);
    println!("========");
    match commit.state() {
        OutputState::Committed => {
            let size = std::fs::metadata(&paths.final_path)?.len();
            println!("Output:    committed ({}, {} bytes)", paths.final_path.display(), size);
            return Ok(());
        }
        OutputState::Recovering => {
            println!("Output:    interrupted, will resume from {}", paths.tmp_path.display());
            if paths.old_path.exists() {
                println!("           replay pending from {}", paths.old_path.display());
            }
        }
        OutputState::Absent => println!("Output:    not started"),
    }

    let progress = ProgressStore::load(&paths.progress_path)?;
    if progress.is_empty() {
        println!("Progress:  none recorded");
        return Ok(());
    }
    println!(
        "Progress:  {}/{} WARCs done, {} records seen",
        progress.done_count(),
        progress.len(),
        progress.total_records_seen()
    );
    for (source, entry) in progress.iter().filter(|(_, p)| !p.done) {
        println!(
            "  pending  {} (last record {})",
            truncate_str(source, 100),
            entry.last_record_seen
        );
    }
    Ok(())
}
