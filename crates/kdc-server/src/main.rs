//! KDC command-line binary.
//!
//! Every invocation opens the database, runs one operation and prints the
//! result as JSON on stdout. Failures are printed as an error report and the
//! process exits non-zero. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! kdc register alice
//! kdc register bob
//! kdc create-session alice bob chat1
//! kdc send alice bob chat1 --private-exponent <d_alice> "Hello, World!"
//! kdc read bob alice chat1 --private-exponent <d_bob>
//! ```

use std::{
    collections::BTreeSet,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use kdc_core::{
    ErrorReport, FlowRequest, FlowStep, Identity, KdcConfig, KdcError, KeyCenter, MessageReceipt,
    ReadFlow, ReadMessage, ReadOutput, SendFlow, SendOutput, SessionKeys,
};
use kdc_crypto::{
    CaesarKey, PrimeRange, PrivateExponent, PublicKey,
    number_theory::{DEFAULT_PRIME_MAX, DEFAULT_PRIME_MIN},
};
use kdc_server::{Kdc, RedbStorage, SystemEnv};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Toy key distribution center
#[derive(Parser, Debug)]
#[command(name = "kdc")]
#[command(about = "Toy key distribution center: RSA-wrapped Caesar session keys")]
#[command(version)]
struct Args {
    /// Path to the database file
    #[arg(long, default_value = "kdc.redb")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Inclusive lower bound for RSA primes
    #[arg(long, default_value_t = DEFAULT_PRIME_MIN)]
    prime_min: u64,

    /// Exclusive upper bound for RSA primes
    #[arg(long, default_value_t = DEFAULT_PRIME_MAX)]
    prime_max: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an identity and print its private exponent (shown once)
    Register {
        /// Unique name
        name: String,
    },
    /// List registered identities and their public keys
    Users,
    /// Issue a session key between two identities
    CreateSession {
        /// Initiator
        from: String,
        /// Other party
        to: String,
        /// Label for this exchange
        label: String,
    },
    /// List identities sharing a session with IDENTITY
    Partners {
        /// Identity to look up
        identity: String,
    },
    /// List session labels between two identities
    Labels {
        /// Identity to look up
        identity: String,
        /// Other party
        partner: String,
    },
    /// List identities that have sent messages to RECEIVER
    Senders {
        /// Receiving identity
        receiver: String,
    },
    /// Unwrap a session key with a private exponent
    RecoverKey {
        /// Identity the key was wrapped for
        identity: String,
        /// Other party
        partner: String,
        /// Session label
        label: String,
        /// Private exponent of IDENTITY
        #[arg(long, env = "KDC_PRIVATE_EXPONENT")]
        private_exponent: String,
    },
    /// Encrypt and store a message within a session
    Send {
        /// Sending identity
        sender: String,
        /// Receiving identity
        receiver: String,
        /// Session label
        label: String,
        /// Message text
        message: String,
        /// Private exponent of SENDER
        #[arg(long, env = "KDC_PRIVATE_EXPONENT")]
        private_exponent: String,
    },
    /// Decrypt every message SENDER sent to RECEIVER within a session
    Read {
        /// Receiving identity
        receiver: String,
        /// Sending identity
        sender: String,
        /// Session label
        label: String,
        /// Private exponent of RECEIVER
        #[arg(long, env = "KDC_PRIVATE_EXPONENT")]
        private_exponent: String,
    },
}

/// JSON printed on success.
#[derive(Serialize)]
#[serde(untagged)]
enum Output {
    Registered { name: String, public_key: PublicKey, private_exponent: u64 },
    Identities(Vec<Identity>),
    Session(SessionKeys),
    Names(BTreeSet<String>),
    Key { caesar_key: CaesarKey },
    Sent(MessageReceipt),
    Messages(Vec<ReadMessage>),
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let (json, code) = match run(args) {
        Ok(output) => (serde_json::to_string_pretty(&output), ExitCode::SUCCESS),
        Err(err) => (serde_json::to_string_pretty(&ErrorReport::from(&err)), ExitCode::FAILURE),
    };

    let written = json
        .map_err(io::Error::from)
        .and_then(|json| writeln!(io::stdout().lock(), "{json}"));
    if let Err(e) = written {
        tracing::error!("Failed to write output: {}", e);
        return ExitCode::FAILURE;
    }

    code
}

fn run(args: Args) -> Result<Output, KdcError> {
    let prime_range = PrimeRange::new(args.prime_min, args.prime_max)?;
    let config = KdcConfig { prime_range, ..KdcConfig::default() };
    let storage = RedbStorage::open(&args.db)?;
    let kdc = Kdc::new(SystemEnv::new(), storage, config);

    tracing::debug!("Opened {}", args.db.display());

    match args.command {
        Command::Register { name } => {
            let registration = kdc.register(&name)?;
            Ok(Output::Registered {
                name: registration.identity.name,
                public_key: registration.identity.public_key,
                private_exponent: registration.private_exponent.expose(),
            })
        },
        Command::Users => Ok(Output::Identities(kdc.list_identities()?)),
        Command::CreateSession { from, to, label } => {
            Ok(Output::Session(kdc.create_session(&from, &to, &label)?))
        },
        Command::Partners { identity } => Ok(Output::Names(kdc.list_partners(&identity)?)),
        Command::Labels { identity, partner } => {
            Ok(Output::Names(kdc.list_labels(&identity, &partner)?))
        },
        Command::Senders { receiver } => Ok(Output::Names(kdc.list_senders(&receiver)?)),
        Command::RecoverKey { identity, partner, label, private_exponent } => {
            let private_exponent: PrivateExponent = private_exponent.parse()?;
            let caesar_key =
                kdc.recover_session_key(&identity, &partner, &label, &private_exponent)?;
            Ok(Output::Key { caesar_key })
        },
        Command::Send { sender, receiver, label, message, private_exponent } => {
            let request = FlowRequest {
                step: FlowStep::Finish,
                username: Some(sender),
                private_exponent: Some(private_exponent),
                partner: Some(receiver),
                label: Some(label),
                plaintext: Some(message),
            };
            match SendFlow::replay(&kdc, &request)? {
                (_, SendOutput::Sent(receipt)) => Ok(Output::Sent(receipt)),
                (flow, _) => Err(incomplete(&format!("{:?}", flow.state()))),
            }
        },
        Command::Read { receiver, sender, label, private_exponent } => {
            let request = FlowRequest {
                step: FlowStep::Finish,
                username: Some(receiver),
                private_exponent: Some(private_exponent),
                partner: Some(sender),
                label: Some(label),
                plaintext: None,
            };
            match ReadFlow::replay(&kdc, &request)? {
                (_, ReadOutput::Messages(messages)) => Ok(Output::Messages(messages)),
                (flow, _) => Err(incomplete(&format!("{:?}", flow.state()))),
            }
        },
    }
}

fn incomplete(state: &str) -> KdcError {
    KdcError::invalid("step", format!("flow stopped early in {state}"))
}
