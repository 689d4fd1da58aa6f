use doclink_resolver::app::{handle_request, FunctionUrlEvent, FunctionUrlResponse};
use doclink_resolver::utils::{logger, validation::Validate};
use doclink_resolver::{DefaultResolver, ResolverConfig};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;

async fn function_handler(
    resolver: &DefaultResolver,
    event: LambdaEvent<FunctionUrlEvent>,
) -> Result<FunctionUrlResponse, Error> {
    let method = event.payload.method().to_string();
    let body = event.payload.decoded_body();
    tracing::info!(
        request_id = %event.context.request_id,
        "Handling {} request",
        method
    );

    let response = handle_request(resolver, &method, body.as_deref()).await;
    tracing::info!("Responding with status {}", response.status);
    Ok(response.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    // 冷啟動時載入配置，之後每次呼叫共用
    let config = ResolverConfig::load(None)?;
    config.validate()?;
    tracing::info!(
        "Resolver ready (strategies: {:?}, block_scripts: {})",
        config.strategies,
        config.browser.block_scripts
    );
    let resolver = Arc::new(DefaultResolver::from_config(&config)?);

    run(service_fn(move |event: LambdaEvent<FunctionUrlEvent>| {
        let resolver = Arc::clone(&resolver);
        async move { function_handler(&resolver, event).await }
    }))
    .await
}
