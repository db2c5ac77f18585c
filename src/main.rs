//! compdesc-sign CLI
//!
//! Entry point for the `compdesc-sign` command-line tool.

use clap::{Parser, Subcommand};
use compdesc_signing::config::{host_config_path, EffectiveConfig, SigningConfig};
use compdesc_signing::model::{ComponentDescriptor, DigestSpec, Resource};
use compdesc_signing::signatures::ResolveError;
use compdesc_signing::{
    exit_code, hash_for_component_descriptor, normalise_component_descriptor,
    sign_component_descriptor, verify_signed_component_descriptor, InMemorySource,
    RecursiveDigester, RsaSigner, RsaVerifier, SignatureError, EXIT_STRUCTURAL, EXIT_USAGE,
    EXIT_VERIFICATION,
};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "compdesc-sign")]
#[command(about = "Normalise, digest, sign and verify component descriptors", version)]
struct Cli {
    /// Path to a signing config file (TOML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalised form of a descriptor
    Normalise {
        /// Component descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Print the digest of a descriptor as JSON
    Hash {
        descriptor: PathBuf,

        /// Hash algorithm (sha256, sha512)
        #[arg(long)]
        hash_algorithm: Option<String>,
    },

    /// Fill in reference digests from a directory of referenced descriptors
    Digest {
        descriptor: PathBuf,

        /// Directory holding referenced descriptors as *.json files
        #[arg(long, short = 'r')]
        repository: Option<PathBuf>,

        #[arg(long)]
        hash_algorithm: Option<String>,

        /// Access types to exclude from the signature (comma-separated)
        #[arg(long, value_delimiter = ',')]
        skip_access_types: Option<Vec<String>>,

        /// Output file (default: overwrite the input)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Digest and sign a descriptor, appending the signature
    Sign {
        descriptor: PathBuf,

        /// Digest references from this directory of *.json descriptors before signing
        #[arg(long, short = 'r')]
        repository: Option<PathBuf>,

        /// Also sign every referenced descriptor, rewriting its file in the repository
        #[arg(long, requires = "repository")]
        recursive: bool,

        /// PKCS #8 private key (PEM)
        #[arg(long)]
        private_key: Option<PathBuf>,

        #[arg(long)]
        signature_name: Option<String>,

        /// Signature encoding (application/vnd.ocm.signature.rsa, application/x-pem-file)
        #[arg(long)]
        media_type: Option<String>,

        #[arg(long)]
        hash_algorithm: Option<String>,

        /// Output file (default: overwrite the input)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Verify a named signature of a descriptor
    Verify {
        descriptor: PathBuf,

        /// Check reference digests against the descriptors in this directory
        #[arg(long, short = 'r')]
        repository: Option<PathBuf>,

        /// PKIX public key (PEM)
        #[arg(long)]
        public_key: Option<PathBuf>,

        #[arg(long)]
        signature_name: Option<String>,
    },

    /// Generate an RSA key pair
    Keygen {
        /// Where to write the PKCS #8 private key
        #[arg(long)]
        private_key: PathBuf,

        /// Where to write the PKIX public key
        #[arg(long)]
        public_key: PathBuf,

        #[arg(long, default_value_t = 2048)]
        bits: usize,
    },

    /// Print the effective configuration with its sources
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Normalise { descriptor } => run_normalise(&descriptor),
        Commands::Hash {
            descriptor,
            hash_algorithm,
        } => {
            let overrides = overrides(&[("hash_algorithm", hash_algorithm.map(Into::into))]);
            let config = load_config(config_path.as_deref(), overrides);
            run_hash(&descriptor, &config);
        }
        Commands::Digest {
            descriptor,
            repository,
            hash_algorithm,
            skip_access_types,
            output,
        } => {
            let overrides = overrides(&[
                ("hash_algorithm", hash_algorithm.map(Into::into)),
                ("skip_access_types", skip_access_types.map(Into::into)),
            ]);
            let config = load_config(config_path.as_deref(), overrides);
            run_digest(&descriptor, repository.as_deref(), output.as_deref(), &config);
        }
        Commands::Sign {
            descriptor,
            repository,
            recursive,
            private_key,
            signature_name,
            media_type,
            hash_algorithm,
            output,
        } => {
            let overrides = overrides(&[
                ("private_key", private_key.map(path_value)),
                ("signature_name", signature_name.map(Into::into)),
                ("media_type", media_type.map(Into::into)),
                ("hash_algorithm", hash_algorithm.map(Into::into)),
            ]);
            let config = load_config(config_path.as_deref(), overrides);
            run_sign(
                &descriptor,
                repository.as_deref(),
                recursive,
                output.as_deref(),
                &config,
            );
        }
        Commands::Verify {
            descriptor,
            repository,
            public_key,
            signature_name,
        } => {
            let overrides = overrides(&[
                ("public_key", public_key.map(path_value)),
                ("signature_name", signature_name.map(Into::into)),
            ]);
            let config = load_config(config_path.as_deref(), overrides);
            run_verify(&descriptor, repository.as_deref(), &config);
        }
        Commands::Keygen {
            private_key,
            public_key,
            bits,
        } => run_keygen(&private_key, &public_key, bits),
        Commands::Config => run_config(config_path.as_deref()),
    }
}

fn run_normalise(descriptor: &Path) {
    let cd = load_descriptor(descriptor);
    let normalised = normalise_component_descriptor(&cd).unwrap_or_else(|e| fail_signature(&e));
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(&normalised).and_then(|_| stdout.flush()) {
        fail(EXIT_USAGE, format!("Error writing output: {}", e));
    }
}

fn run_hash(descriptor: &Path, config: &SigningConfig) {
    let cd = load_descriptor(descriptor);
    let hash = config.hash().unwrap_or_else(|e| fail(EXIT_USAGE, e.to_string()));
    let digest = hash_for_component_descriptor(&cd, hash).unwrap_or_else(|e| fail_signature(&e));
    print_json(&digest);
}

fn run_digest(
    descriptor: &Path,
    repository: Option<&Path>,
    output: Option<&Path>,
    config: &SigningConfig,
) {
    let mut cd = load_descriptor(descriptor);
    let source = repository.map(load_repository).unwrap_or_default();
    let hash = config.hash().unwrap_or_else(|e| fail(EXIT_USAGE, e.to_string()));

    let digester = RecursiveDigester::new(&source, hash)
        .skip_access_types(config.skip_access_types.iter().cloned());
    let digested = digester
        .digest(&mut cd, existing_resource_digest)
        .unwrap_or_else(|e| fail_signature(&e));

    write_descriptor(&cd, output.unwrap_or(descriptor));
    eprintln!("Digested {} component descriptor(s)", digested.len());
}

/// Resource content is not fetched here; resources must already carry digests.
fn existing_resource_digest(
    _cd: &ComponentDescriptor,
    resource: &Resource,
) -> Result<DigestSpec, ResolveError> {
    resource.digest.clone().ok_or_else(|| {
        let access = resource
            .access
            .as_ref()
            .map(|a| a.object_type.as_str())
            .unwrap_or("None");
        format!(
            "resource {}:{} has no digest and access type '{}' cannot be resolved locally",
            resource.name, resource.version, access
        )
        .into()
    })
}

fn run_sign(
    descriptor: &Path,
    repository: Option<&Path>,
    recursive: bool,
    output: Option<&Path>,
    config: &SigningConfig,
) {
    let mut cd = load_descriptor(descriptor);
    let key_path = config
        .private_key
        .as_deref()
        .unwrap_or_else(|| fail(EXIT_USAGE, "No private key configured (--private-key)"));
    let pem = read_to_string(key_path);
    let signer = RsaSigner::from_pkcs8_pem(&pem, config.media_type.as_str())
        .unwrap_or_else(|e| fail_signature(&e));
    let hash = config.hash().unwrap_or_else(|e| fail(EXIT_USAGE, e.to_string()));

    let source = repository.map(load_repository);
    if let Some(source) = &source {
        let digester = RecursiveDigester::new(source, hash)
            .skip_access_types(config.skip_access_types.iter().cloned());
        let mut digested = digester
            .digest(&mut cd, existing_resource_digest)
            .unwrap_or_else(|e| fail_signature(&e));
        // the root comes last and is signed below
        digested.pop();

        if recursive {
            for mut child in digested {
                sign_component_descriptor(&mut child, &signer, hash, &config.signature_name)
                    .unwrap_or_else(|e| fail_signature(&e));
                let path = source
                    .path_of(&child.component.name, &child.component.version)
                    .unwrap_or_else(|| {
                        fail(
                            EXIT_USAGE,
                            format!("No repository file for {}", child.component_ref()),
                        )
                    });
                write_descriptor(&child, path);
                eprintln!("Signed {} in {}", child.component_ref(), path.display());
            }
        }
    }

    let signature = sign_component_descriptor(&mut cd, &signer, hash, &config.signature_name)
        .unwrap_or_else(|e| fail_signature(&e));

    write_descriptor(&cd, output.unwrap_or(descriptor));
    eprintln!(
        "Signed {} as '{}' ({})",
        cd.component_ref(),
        signature.name,
        signature.digest
    );
}

fn run_verify(descriptor: &Path, repository: Option<&Path>, config: &SigningConfig) {
    let cd = load_descriptor(descriptor);
    let key_path = config
        .public_key
        .as_deref()
        .unwrap_or_else(|| fail(EXIT_USAGE, "No public key configured (--public-key)"));
    let pem = read_to_string(key_path);
    let verifier = RsaVerifier::from_public_key_pem(&pem).unwrap_or_else(|e| fail_signature(&e));

    if let Some(dir) = repository {
        let source = load_repository(dir);
        let hash = config.hash().unwrap_or_else(|e| fail(EXIT_USAGE, e.to_string()));
        let digester = RecursiveDigester::new(&source, hash)
            .skip_access_types(config.skip_access_types.iter().cloned());
        if let Err(e) = digester.check(&cd, existing_resource_digest) {
            // a stale stored digest means the signed tree no longer matches
            let code = match e {
                SignatureError::DigestMismatch { .. } => EXIT_VERIFICATION,
                _ => exit_code(&e),
            };
            fail(code, format!("Error: {}", e));
        }
    }

    verify_signed_component_descriptor(&cd, &verifier, &config.signature_name)
        .unwrap_or_else(|e| fail_signature(&e));
    println!(
        "Signature '{}' of {} verified",
        config.signature_name,
        cd.component_ref()
    );
}

fn run_keygen(private_key_path: &Path, public_key_path: &Path, bits: usize) {
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error generating key: {}", e)));
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error encoding private key: {}", e)));
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error encoding public key: {}", e)));

    write_file(private_key_path, private_pem.as_bytes());
    write_file(public_key_path, public_pem.as_bytes());
    eprintln!(
        "Wrote {}-bit key pair to {} and {}",
        bits,
        private_key_path.display(),
        public_key_path.display()
    );
}

fn run_config(config_path: Option<&Path>) {
    let effective = EffectiveConfig::build(host_config_path().as_deref(), config_path, None)
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error loading config: {}", e)));
    match effective.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => fail(EXIT_USAGE, format!("Error serializing config: {}", e)),
    }
}

fn overrides(values: &[(&str, Option<serde_json::Value>)]) -> Option<serde_json::Value> {
    let map: serde_json::Map<String, serde_json::Value> = values
        .iter()
        .filter_map(|(k, v)| v.clone().map(|v| (k.to_string(), v)))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(map))
    }
}

fn path_value(path: PathBuf) -> serde_json::Value {
    serde_json::Value::String(path.to_string_lossy().to_string())
}

fn load_config(config_path: Option<&Path>, overrides: Option<serde_json::Value>) -> SigningConfig {
    EffectiveConfig::build(host_config_path().as_deref(), config_path, overrides)
        .and_then(|c| c.signing_config())
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error loading config: {}", e)))
}

fn load_repository(dir: &Path) -> InMemorySource {
    InMemorySource::from_dir(dir).unwrap_or_else(|e| {
        fail(EXIT_USAGE, format!("Error loading repository {}: {}", dir.display(), e))
    })
}

fn load_descriptor(path: &Path) -> ComponentDescriptor {
    let cd = ComponentDescriptor::from_file(path).unwrap_or_else(|e| {
        let code = if e.kind() == io::ErrorKind::InvalidData {
            EXIT_STRUCTURAL
        } else {
            EXIT_USAGE
        };
        fail(code, format!("Error reading {}: {}", path.display(), e))
    });
    if let Err(e) = cd.validate() {
        fail(
            EXIT_STRUCTURAL,
            format!("Invalid component descriptor {}: {}", path.display(), e),
        );
    }
    cd
}

fn write_descriptor(cd: &ComponentDescriptor, path: &Path) {
    if let Err(e) = cd.write_to_file(path) {
        fail(EXIT_USAGE, format!("Error writing {}: {}", path.display(), e));
    }
}

fn read_to_string(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(EXIT_USAGE, format!("Error reading {}: {}", path.display(), e)))
}

fn write_file(path: &Path, contents: &[u8]) {
    if let Err(e) = fs::write(path, contents) {
        fail(EXIT_USAGE, format!("Error writing {}: {}", path.display(), e));
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(EXIT_USAGE, format!("Error serializing output: {}", e)),
    }
}

fn fail_signature(err: &SignatureError) -> ! {
    fail(exit_code(err), format!("Error: {}", err))
}

fn fail(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(code);
}
