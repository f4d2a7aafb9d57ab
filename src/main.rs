use anyhow::Result;

use ara_template_store::config::Settings;
use ara_template_store::context::TemplateStoreContext;
use ara_template_store::metrics::encode_metrics;
use ara_template_store::telemetry::init_tracing;
use ara_template_store::template::NotificationChannel;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_tracing(&settings.logging)?;
    tracing::info!(backend = %settings.store.backend, "Configuration loaded");

    // Create the template store
    let context = TemplateStoreContext::from_settings(settings).await?;

    // Seed configured tenants with the default templates
    let mut failures = 0;
    for tenant_domain in &context.settings.seed.tenants {
        for channel in [NotificationChannel::Email, NotificationChannel::Sms] {
            match context
                .manager
                .add_default_notification_templates(channel.as_str(), tenant_domain)
                .await
            {
                Ok(added) => tracing::info!(
                    tenant_domain = %tenant_domain,
                    channel = %channel,
                    added,
                    "Default templates seeded"
                ),
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        tenant_domain = %tenant_domain,
                        channel = %channel,
                        error = %e,
                        "Failed to seed default templates"
                    );
                }
            }
        }
    }

    if let Ok(metrics) = encode_metrics() {
        tracing::debug!(metrics = %metrics, "Seeding metrics");
    }

    context.close().await;

    if failures > 0 {
        anyhow::bail!("{} seeding operation(s) failed", failures);
    }

    tracing::info!("Seeding complete");
    Ok(())
}
