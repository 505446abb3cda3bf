mod app;

use app::GalleriaApp;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("galleria=info".parse()?),
        )
        .init();

    let app = GalleriaApp::new()?;
    std::process::exit(app.run());
}
