use anyhow::Result;
use warcsift::{
    config::Config,
    language::{ClassifierLanguageDetector, LanguageDetector},
    models::{load_classifier, ModelStore},
};

pub fn list_languages(config: Config) -> Result<()> {
    let store = ModelStore::new(config.models.cache_dir.clone(), &config.fetch.user_agent)?;
    let path = store.ensure_local(&config.models.language_detector)?;
    let detector = ClassifierLanguageDetector::new(load_classifier(&path)?);

    let mut languages = detector.languages()?;
    languages.sort();
    println!("{} languages:", languages.len());
    for chunk in languages.chunks(12) {
        println!("  {}", chunk.join(" "));
    }
    Ok(())
}
