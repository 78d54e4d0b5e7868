//! Command-line entry point for the GHST upgrade verifier.
//!
//! Talks to a dev node forked from Polygon: swaps the GHST proxy to its new
//! implementation and checks that storage survived and that the signed
//! authorization entry points (permit, delegateBySig, meta-transactions)
//! accept signatures produced by the configured account.

use clap::{Parser, Subcommand};
use ghst_config::Config;
use ghst_core::{HarnessBuilder, UpgradeHarness};
use ghst_types::{
	AuthorizationRequest, Bytes, DelegationRequest, MetaTransactionRequest, PermitRequest,
	Address, U256,
};
use std::path::PathBuf;

/// Command-line arguments for the verifier.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Snapshot, swap the implementation, snapshot again and run every check
	Verify,
	/// Print the current state snapshot as JSON
	Snapshot,
	/// Sign an authorization with the configured account and print it
	Sign {
		#[command(subcommand)]
		kind: SignCommand,
	},
	/// Mine blocks on the dev node
	Mine {
		#[arg(short, long, default_value_t = 1)]
		blocks: u64,
	},
}

#[derive(Subcommand, Debug)]
enum SignCommand {
	Permit {
		#[arg(long)]
		spender: Address,
		#[arg(long)]
		value: U256,
		/// Defaults to the account's current nonce
		#[arg(long)]
		nonce: Option<U256>,
		/// Defaults to the configured deadline
		#[arg(long)]
		deadline: Option<U256>,
	},
	MetaTransaction {
		/// ABI-encoded call, hex
		#[arg(long)]
		function_signature: Bytes,
		#[arg(long)]
		nonce: Option<U256>,
	},
	Delegation {
		#[arg(long)]
		delegatee: Address,
		#[arg(long)]
		nonce: Option<U256>,
		#[arg(long)]
		expiry: Option<U256>,
	},
}

impl SignCommand {
	/// The request to sign, and the nonce to sign it at if one was given.
	fn request(self, config: &Config) -> (AuthorizationRequest, Option<U256>) {
		let deadline = U256::from(config.harness.deadline);
		match self {
			SignCommand::Permit {
				spender,
				value,
				nonce,
				deadline: permit_deadline,
			} => (
				PermitRequest {
					owner: Address::ZERO,
					spender,
					value,
					nonce: nonce.unwrap_or_default(),
					deadline: permit_deadline.unwrap_or(deadline),
				}
				.into(),
				nonce,
			),
			SignCommand::MetaTransaction {
				function_signature,
				nonce,
			} => (
				MetaTransactionRequest {
					nonce: nonce.unwrap_or_default(),
					from: Address::ZERO,
					function_signature,
				}
				.into(),
				nonce,
			),
			SignCommand::Delegation {
				delegatee,
				nonce,
				expiry,
			} => (
				DelegationRequest {
					delegatee,
					nonce: nonce.unwrap_or_default(),
					expiry: expiry.unwrap_or(deadline),
				}
				.into(),
				nonce,
			),
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = load_config(&args.config).await?;
	tracing::info!(
		rpc_url = %config.network.rpc_url,
		proxy = %config.contracts.proxy,
		account = %config.account.primary,
		"Loaded configuration"
	);

	let harness = HarnessBuilder::new(config.clone()).build().await?;
	match args.command {
		Command::Verify => verify(&harness).await,
		Command::Snapshot => {
			let snapshot = harness.snapshot().await?;
			println!("{}", serde_json::to_string_pretty(&snapshot)?);
			Ok(())
		},
		Command::Sign { kind } => sign(&harness, &config, kind).await,
		Command::Mine { blocks } => {
			harness.proxy().mine(blocks).await?;
			let block = harness.proxy().block_number().await?;
			tracing::info!(blocks, block, "Mined");
			Ok(())
		},
	}
}

async fn load_config(path: &std::path::Path) -> Result<Config, Box<dyn std::error::Error>> {
	let path = path
		.to_str()
		.ok_or_else(|| format!("Configuration path is not valid UTF-8: {}", path.display()))?;
	Ok(Config::from_file(path).await?)
}

async fn verify(harness: &UpgradeHarness) -> Result<(), Box<dyn std::error::Error>> {
	let report = harness.verify().await?;
	println!("{}", serde_json::to_string_pretty(&report)?);

	for check in &report.checks {
		let mark = if check.passed { "PASS" } else { "FAIL" };
		eprintln!("[{}] {}: {}", mark, check.name, check.detail);
	}
	let failed = report.failures().count();
	if failed > 0 {
		return Err(format!("{} of {} checks failed", failed, report.checks.len()).into());
	}
	Ok(())
}

async fn sign(
	harness: &UpgradeHarness,
	config: &Config,
	kind: SignCommand,
) -> Result<(), Box<dyn std::error::Error>> {
	let (request, nonce) = kind.request(config);
	let signer = harness.account().signer();
	let signed = match nonce {
		Some(_) => harness.flow().signatures().sign(signer, request).await?,
		None => harness.flow().prepare(signer, request).await?,
	};

	let output = serde_json::json!({
		"signer": signed.signer,
		"request": signed.request,
		"v": signed.signature.v,
		"r": signed.signature.r,
		"s": signed.signature.s,
		"signature": signed.signature.to_hex(),
	});
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
