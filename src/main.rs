mod adapter_console;

use ayjx_yulu::Ayjx;
use ayjx_yulu::plugins::YuluPlugin;

use adapter_console::ConsoleAdapter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ayjx = Ayjx::builder()
        .config_path("config.toml")
        .adapter(ConsoleAdapter::default())
        .plugin(YuluPlugin::new())
        .build();

    ayjx.run().await?;
    Ok(())
}
