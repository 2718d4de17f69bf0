use anyhow::Result;
use novelreader::core::config::Config;
use novelreader::services::app::ReaderApp;
use novelreader::services::llm::create_llm;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };

    config.ensure_directories()?;

    let llm = create_llm(&config.llm)?;

    let mut app = ReaderApp::new(config, llm)?;
    app.run().await
}
