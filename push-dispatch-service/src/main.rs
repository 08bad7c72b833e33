//! Ingress binary: wires the AWS adapters into the core and dispatches one
//! validated action request per invocation.

mod handler;
mod request;

use crate::handler::{execute, messages, pair_health_response, ResponseDocument};
use crate::request::{parse_request, parse_service};
use clap::{Parser, Subcommand};
use push_dispatch::{CancelOutcome, PushService, RequestContext, ServiceConfig};
use push_dispatch_aws::{
    aws_sdk_config, DynamoAuditSink, DynamoKeyValueStore, HttpWebhookNotifier, SnsPushTransport,
};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command()]
struct ServiceArgs {
    /// Config file (json5); falls back to process environment when absent.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one action request document (JSON) from a file, or stdin when
    /// no file is given.
    Handle {
        #[arg(short, long, value_name = "FILE")]
        request: Option<String>,
    },
    /// Unregister a token the transport reported as undeliverable.
    DeliveryFailure {
        #[arg(long)]
        device_token: String,
        #[arg(long)]
        message_id: String,
        #[arg(long, default_value = "app")]
        service: String,
    },
    /// Classify the health of one device's record pair.
    CheckPair {
        #[arg(long)]
        device_token: String,
    },
}

fn load_config(path: Option<&str>) -> Result<ServiceConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let mut contents = String::new();
            File::open(path)?.read_to_string(&mut contents)?;
            Ok(json5::from_str(&contents)?)
        }
        None => Ok(ServiceConfig::from_env()?),
    }
}

fn read_request(path: Option<&str>) -> Result<String, Box<dyn Error>> {
    let mut contents = String::new();
    match path {
        Some(path) => {
            File::open(path)?.read_to_string(&mut contents)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut contents)?;
        }
    }
    Ok(contents)
}

async fn build_service(config: &ServiceConfig) -> PushService {
    let sdk_config = aws_sdk_config(config).await;
    let dynamo = aws_sdk_dynamodb::Client::new(&sdk_config);
    let sns = aws_sdk_sns::Client::new(&sdk_config);

    PushService::new(
        Arc::new(config.clone()),
        Arc::new(DynamoKeyValueStore::new(dynamo.clone(), &config.table_name)),
        Arc::new(SnsPushTransport::new(sns)),
        Arc::new(DynamoAuditSink::new(dynamo, &config.table_name)),
        Arc::new(HttpWebhookNotifier::new(config.webhooks.clone())),
    )
}

fn print_response(response: &ResponseDocument) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = ServiceArgs::parse();
    let config = load_config(args.config.as_deref())?;
    let service = build_service(&config).await;

    info!("push-dispatch-service started");

    let response = match args.command {
        Command::Handle { request } => {
            let raw = read_request(request.as_deref())?;
            match parse_request(&raw) {
                Ok((header, action)) => execute(&service, &header, action).await,
                Err(err) => {
                    info!(err = %err, "rejecting malformed request");
                    ResponseDocument::bad_request(messages::INVALID_REQUEST)
                }
            }
        }
        Command::DeliveryFailure {
            device_token,
            message_id,
            service: service_name,
        } => match parse_service(&service_name) {
            Some(origin) => {
                let ctx = RequestContext::new(&Uuid::new_v4().to_string(), origin);
                match service
                    .unregister_failed_delivery(&ctx, &device_token, &message_id)
                    .await
                {
                    Ok(CancelOutcome::Cancelled(_)) => {
                        ResponseDocument::ok(messages::TOKEN_CANCELLED)
                    }
                    Ok(CancelOutcome::TokenNotFound) => {
                        ResponseDocument::ok(messages::TOKEN_NOT_FOUND)
                    }
                    Err(err) => {
                        tracing::error!(err = %err, "delivery-failure unregistration failed");
                        ResponseDocument::internal_error()
                    }
                }
            }
            None => ResponseDocument::bad_request(messages::INVALID_REQUEST),
        },
        Command::CheckPair { device_token } => {
            match service.token_index().check_pair(&device_token).await {
                Ok(health) => pair_health_response(&device_token, &health),
                Err(err) => {
                    tracing::error!(err = %err, "pair check failed");
                    ResponseDocument::internal_error()
                }
            }
        }
    };

    print_response(&response)
}
