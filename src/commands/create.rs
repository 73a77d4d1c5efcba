use anyhow::Result;
use reqwest::blocking::Client;
use tracing::{info, warn};
use warcsift::{
    catalog::{ArchiveCatalog, CommonCrawlCatalog, GroupSelection, PathsFileCatalog},
    config::Config,
    pipeline::{run_groups, GroupOrchestrator},
};

pub fn create_corpus(config: Config, quiet: bool) -> Result<()> {
    let selection: GroupSelection = config.corpus.groups.parse()?;

    let groups = match &config.corpus.paths_file {
        Some(path) => {
            info!("Reading archive listing from {}", path.display());
            PathsFileCatalog::new(path, &config.corpus.base_url).resolve(&config.corpus.name)?
        }
        None => {
            let client = Client::builder()
                .user_agent(&config.fetch.user_agent)
                .connect_timeout(config.fetch.connect_timeout())
                .timeout(config.fetch.read_timeout())
                .build()?;
            CommonCrawlCatalog::new(client, &config.corpus.base_url).resolve(&config.corpus.name)?
        }
    };
    let indices = selection.resolve(groups.len())?;
    info!(
        "Building {} of {} groups into {}",
        indices.len(),
        groups.len(),
        config.output.destination.display()
    );

    let mut orchestrator = GroupOrchestrator::from_config(&config)?.quiet(quiet);
    let summary = run_groups(&mut orchestrator, &groups, &indices)?;

    if summary.failed > 0 || summary.incomplete > 0 {
        warn!(
            "{} groups failed and {} are incomplete; rerun to resume them",
            summary.failed, summary.incomplete
        );
    }
    Ok(())
}
