use anyhow::{Context, Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub const SECRET_ENV: &str = "PEMKEYS_SECRET";

/// Reads the secret key to store, hex encoded.
pub fn read_secret_key() -> Result<Zeroizing<Vec<u8>>> {
    //  Environment Variable
    //  PEMKEYS_SECRET="0102..." pemkeys --file keys.pem add Ed25519
    if let Ok(hex_sk) = std::env::var(SECRET_ENV) {
        let hex_sk = Zeroizing::new(hex_sk);
        if !hex_sk.is_empty() {
            return decode_hex(&hex_sk);
        }
    }

    //  stdin (Pipeline)
    //  echo "0102..." | pemkeys --file keys.pem add Ed25519
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;

        if !buf.trim().is_empty() {
            return decode_hex(&buf);
        }
    }

    //  Interactive (TTY)
    if io::stdin().is_terminal() {
        let hex_sk = Zeroizing::new(rpassword::prompt_password("Secret key (hex): ")?);
        if !hex_sk.is_empty() {
            return decode_hex(&hex_sk);
        }
    }

    bail!("No secret key provided")
}

fn decode_hex(hex_sk: &str) -> Result<Zeroizing<Vec<u8>>> {
    let sk = hex::decode(hex_sk.trim()).context("secret key is not valid hex")?;
    Ok(Zeroizing::new(sk))
}
