use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use fragcrypt::crypto::{self, Aes256Ecb};
use fragcrypt::encrypted::{EncryptedFile, CONTAINER_EXTENSION};
use fragcrypt::io;
use fragcrypt::share::{self, SHARE_EXTENSION};
use fragcrypt::sss::{self, Reduction, ShareSet};

/// Longest accepted output base name, in bytes.
const MAX_BASE_LEN: usize = 255;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a document and split the key into N shares, any T of which decrypt it
    Encrypt(EncryptArgs),
    /// Decrypt a document from its share file and encrypted container
    Decrypt(DecryptArgs),
}

// ---------------------------------------------------------------------------
// Shared arg groups
// ---------------------------------------------------------------------------

/// How the password is read.
#[derive(Args, Debug)]
pub struct PasswordArgs {
    /// Read the password as one line from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

/// Split-time share arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReductionArg {
    /// Reduce every evaluation modulo the field prime (share values stay below it)
    Modular,
    /// Plain integer evaluation, as share files from the earlier tool were written
    Integer,
}

impl From<ReductionArg> for Reduction {
    fn from(arg: ReductionArg) -> Self {
        match arg {
            ReductionArg::Modular => Reduction::Modular,
            ReductionArg::Integer => Reduction::Integer,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-command args
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Base name for the outputs: BASE.frg (shares) and BASE.aes (ciphertext)
    #[arg(value_name = "BASE")]
    pub base: PathBuf,

    /// Total number of shares N to create
    #[arg(short = 'n', long)]
    pub num_shares: u8,

    /// Threshold T, the minimum number of shares required to decrypt
    #[arg(short = 't', long)]
    pub threshold: u8,

    /// Document to encrypt
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    #[command(flatten)]
    pub password: PasswordArgs,

    /// Share arithmetic
    #[arg(
        long,
        value_enum,
        env = "FRAGCRYPT_REDUCTION",
        default_value_t = ReductionArg::Modular
    )]
    pub reduction: ReductionArg,
}

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Share file (*.frg)
    #[arg(value_name = "SHARES")]
    pub shares: PathBuf,

    /// Encrypted container (*.aes) with the same base name as the share file
    #[arg(value_name = "CONTAINER")]
    pub container: PathBuf,

    /// Write the plaintext here instead of under its original file name
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Directory for the plaintext when --out is not given (default: current directory)
    #[arg(long, value_name = "DIR", conflicts_with = "out")]
    pub out_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Encrypt(args) => encrypt(args),
        Command::Decrypt(args) => decrypt(args),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn encrypt(args: EncryptArgs) -> Result<()> {
    sss::validate_threshold(args.threshold, args.num_shares)?;
    let (shares_path, container_path) = output_paths(&args.base)?;
    require_non_empty_file(&args.document, "document")?;

    let filename = args
        .document
        .file_name()
        .and_then(|n| n.to_str())
        .context("document file name is not valid UTF-8")?;

    let plaintext = Zeroizing::new(io::read_file(&args.document)?);
    eprintln!("encrypt: read {} bytes of plaintext", plaintext.len());

    let password = read_password(&args.password, true)?;

    let (encrypted, shares) = crypto::seal(
        &plaintext,
        &password,
        filename,
        args.num_shares,
        args.threshold,
        args.reduction.into(),
        &Aes256Ecb,
    )?;

    write_outputs(&shares_path, &shares, &container_path, &encrypted)?;
    eprintln!(
        "encrypt: wrote {}-of-{} shares to {:?}",
        args.threshold, args.num_shares, shares_path
    );
    eprintln!(
        "encrypt: wrote {} bytes of ciphertext to {:?}",
        encrypted.ciphertext.len(),
        container_path
    );
    eprintln!(
        "encrypt: note: AES-256-ECB without IV or authentication tag; \
         the container hides content but does not detect tampering"
    );

    // plaintext and password are zeroized on drop.
    Ok(())
}

fn decrypt(args: DecryptArgs) -> Result<()> {
    require_extension(&args.shares, SHARE_EXTENSION)?;
    require_extension(&args.container, CONTAINER_EXTENSION)?;
    if args.shares.with_extension("") != args.container.with_extension("") {
        bail!(
            "share file {:?} and container {:?} must have the same base name",
            args.shares,
            args.container
        );
    }
    require_non_empty_file(&args.shares, "share file")?;
    require_non_empty_file(&args.container, "container")?;

    let encrypted = EncryptedFile::read(&args.container)
        .context("failed to read encrypted container")?;
    eprintln!("decrypt: {encrypted}");

    let shares = share::read_share_file(&args.shares)
        .context("failed to read share file")?;
    eprintln!(
        "decrypt: {} share(s), threshold {}",
        shares.points.len(),
        shares.threshold
    );

    let plaintext = crypto::open(&encrypted, &shares.points, shares.threshold, &Aes256Ecb)?;

    let out = plaintext_path(&args, &encrypted.filename)?;
    io::write_atomic(&out, &plaintext)
        .with_context(|| format!("write plaintext {:?}", out))?;
    eprintln!("decrypt: wrote {} bytes to {:?}", plaintext.len(), out);

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write the container and the share file as a pair.
///
/// Both are staged first; the container is renamed into place before the
/// shares, so existing shares are kept whenever the container cannot be
/// written.
fn write_outputs(
    shares_path: &Path,
    shares: &ShareSet,
    container_path: &Path,
    encrypted: &EncryptedFile,
) -> Result<()> {
    let container = encrypted.to_bytes()?;
    let text = shares.to_text();
    io::write_all_atomic(&[
        (container_path, container.as_slice()),
        (shares_path, text.as_bytes()),
    ])
    .with_context(|| format!("write {:?} and {:?}", container_path, shares_path))
}

/// `BASE.frg` and `BASE.aes`; a trailing `.frg` on BASE is not doubled.
fn output_paths(base: &Path) -> Result<(PathBuf, PathBuf)> {
    let base = base.to_str().context("base name is not valid UTF-8")?;
    if base.len() > MAX_BASE_LEN {
        bail!(
            "base name is {} bytes, must be at most {MAX_BASE_LEN}",
            base.len()
        );
    }
    let stem = base
        .strip_suffix(&format!(".{SHARE_EXTENSION}"))
        .unwrap_or(base);
    if stem.is_empty() {
        bail!("base name is empty");
    }
    Ok((
        PathBuf::from(format!("{stem}.{SHARE_EXTENSION}")),
        PathBuf::from(format!("{stem}.{CONTAINER_EXTENSION}")),
    ))
}

/// Where the decrypted document goes: `--out`, else the stored name
/// (final component only) inside `--out-dir`.
fn plaintext_path(args: &DecryptArgs, stored_name: &str) -> Result<PathBuf> {
    if let Some(out) = &args.out {
        return Ok(out.clone());
    }
    let name = Path::new(stored_name).file_name().with_context(|| {
        format!("container holds no usable file name ({stored_name:?}); pass --out")
    })?;
    let dir = args.out_dir.as_deref().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(name))
}

fn require_extension(path: &Path, ext: &str) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some(ext) {
        bail!("{:?} must have the .{ext} extension", path);
    }
    Ok(())
}

fn require_non_empty_file(path: &Path, what: &str) -> Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("{what} {:?} does not exist", path))?;
    if !meta.is_file() {
        bail!("{what} {:?} is not a regular file", path);
    }
    if meta.len() == 0 {
        bail!("{what} {:?} is empty", path);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Password input
// ---------------------------------------------------------------------------

/// Read the password from stdin or an echo-free terminal prompt.
///
/// With `confirm`, the terminal prompt asks twice and requires a match.
fn read_password(args: &PasswordArgs, confirm: bool) -> Result<Zeroizing<String>> {
    let password = if args.password_stdin {
        read_password_line()?
    } else {
        let first = prompt_hidden("Password")?;
        if confirm {
            let second = prompt_hidden("Confirm password")?;
            if *first != *second {
                bail!("passwords do not match");
            }
        }
        first
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

fn read_password_line() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut buf)
        .context("read password from stdin")?;
    if buf.is_empty() {
        bail!("unexpected end of input");
    }
    let line = buf.trim_end_matches(['\r', '\n']);
    Ok(Zeroizing::new(line.to_string()))
}

/// Prompt on stderr and read a line in raw mode without echo.
fn prompt_hidden(label: &str) -> Result<Zeroizing<String>> {
    let mut out = std::io::stderr();
    write!(out, "  {label}: ")?;
    out.flush()?;

    crossterm::terminal::enable_raw_mode()
        .context("password prompt needs a terminal; try --password-stdin")?;
    let result = read_hidden_line();
    crossterm::terminal::disable_raw_mode()?;

    write!(out, "\r\n")?;
    out.flush()?;

    result
}

fn read_hidden_line() -> Result<Zeroizing<String>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

    let mut typed = Zeroizing::new(String::new());
    loop {
        let Event::Key(key) = event::read()? else { continue };
        // Ignore key-release events.
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("interrupted");
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("unexpected end of input");
            }
            KeyCode::Char(c) => typed.push(c),
            KeyCode::Backspace => {
                typed.pop();
            }
            KeyCode::Enter => return Ok(typed),
            _ => {}
        }
    }
}
