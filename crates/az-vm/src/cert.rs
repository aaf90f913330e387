//! Certificate helpers: extension check, SHA-1 fingerprint, base64 payloads.
//!
//! The fingerprint format (uppercase hex SHA-1, no separators) is what the
//! management API expects for SSH public keys; it is not used for security.

use std::fs;
use std::path::Path;

use asm_api::{CertificateFile, XMLNS};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

use crate::types::{PublicKey, SshConfiguration};
use crate::{Error, Result};

const CERT_EXTENSION: &str = "pem";
const CERTIFICATE_FORMAT: &str = "pfx";

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reject anything whose last dot-separated segment is not `pem`.
pub fn validate_cert_extension(path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    match raw.rsplit('.').next() {
        Some(CERT_EXTENSION) => Ok(()),
        _ => Err(Error::InvalidCertificateExtension {
            path: raw.into_owned(),
        }),
    }
}

/// SHA-1 of the first PEM block's payload, as 40 uppercase hex characters.
pub fn fingerprint_pem(data: &[u8]) -> Result<String> {
    let block = pem::parse(data).map_err(|e| Error::MalformedCertificate(e.to_string()))?;
    let digest = Sha1::digest(block.contents());
    Ok(digest.iter().map(|b| format!("{b:02X}")).collect())
}

pub fn fingerprint(path: &Path) -> Result<String> {
    fingerprint_pem(&read_file(path)?)
}

pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn encode_file_base64(path: &Path) -> Result<String> {
    Ok(encode_base64(&read_file(path)?))
}

/// SSH key configuration installing the certificate for `user_name`.
pub fn ssh_config(cert_path: &Path, user_name: &str) -> Result<SshConfiguration> {
    validate_cert_extension(cert_path)?;
    let fingerprint = fingerprint(cert_path)?;

    Ok(SshConfiguration {
        public_keys: vec![PublicKey {
            fingerprint,
            path: format!("/home/{user_name}/.ssh/authorized_keys"),
        }],
    })
}

/// Upload document for a hosted service certificate.
pub fn service_certificate(cert_path: &Path) -> Result<CertificateFile> {
    Ok(CertificateFile {
        xmlns: XMLNS.to_string(),
        data: encode_file_base64(cert_path)?,
        certificate_format: CERTIFICATE_FORMAT.to_string(),
        password: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Payload is base64("hello world").
    const TEST_PEM: &str = "-----BEGIN CERTIFICATE-----\naGVsbG8gd29ybGQ=\n-----END CERTIFICATE-----\n";
    const TEST_FINGERPRINT: &str = "2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED";

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_validate_cert_extension() {
        assert!(validate_cert_extension(Path::new("foo.pem")).is_ok());
        assert!(validate_cert_extension(Path::new("/home/me/.ssh/my.cert.pem")).is_ok());
        for bad in ["foo.crt", "foo", "foo.pem.bak", "dir.pem/cert"] {
            assert!(matches!(
                validate_cert_extension(Path::new(bad)),
                Err(Error::InvalidCertificateExtension { .. })
            ));
        }
    }

    #[test]
    fn test_fingerprint_is_uppercase_sha1_of_payload() {
        let fp = fingerprint_pem(TEST_PEM.as_bytes()).unwrap();
        assert_eq!(fp, TEST_FINGERPRINT);
        assert_eq!(fp.len(), 40);
        assert_eq!(fingerprint_pem(TEST_PEM.as_bytes()).unwrap(), fp);
    }

    #[test]
    fn test_fingerprint_ignores_leading_text() {
        let input = format!("subject=CN=test\n{TEST_PEM}");
        assert_eq!(fingerprint_pem(input.as_bytes()).unwrap(), TEST_FINGERPRINT);
    }

    #[test]
    fn test_fingerprint_rejects_non_pem() {
        assert!(matches!(
            fingerprint_pem(b"not a certificate"),
            Err(Error::MalformedCertificate(_))
        ));
        assert!(matches!(fingerprint_pem(b""), Err(Error::MalformedCertificate(_))));
    }

    #[test]
    fn test_fingerprint_missing_file() {
        let err = fingerprint(Path::new("/nonexistent/cert.pem")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_encode_file_base64_round_trips() {
        for contents in [&b""[..], b"\x00\x01\xfe\xff", TEST_PEM.as_bytes()] {
            let file = write_temp(".bin", contents);
            let encoded = encode_file_base64(file.path()).unwrap();
            assert_eq!(STANDARD.decode(encoded).unwrap(), contents);
        }
    }

    #[test]
    fn test_ssh_config_points_at_authorized_keys() {
        let file = write_temp(".pem", TEST_PEM.as_bytes());
        let ssh = ssh_config(file.path(), "azureuser").unwrap();
        assert_eq!(ssh.public_keys.len(), 1);
        assert_eq!(ssh.public_keys[0].fingerprint, TEST_FINGERPRINT);
        assert_eq!(
            ssh.public_keys[0].path,
            "/home/azureuser/.ssh/authorized_keys"
        );
    }

    #[test]
    fn test_ssh_config_checks_extension_first() {
        let file = write_temp(".crt", TEST_PEM.as_bytes());
        assert!(matches!(
            ssh_config(file.path(), "azureuser"),
            Err(Error::InvalidCertificateExtension { .. })
        ));
    }

    #[test]
    fn test_service_certificate_document() {
        let file = write_temp(".pem", TEST_PEM.as_bytes());
        let doc = service_certificate(file.path()).unwrap();
        assert_eq!(doc.certificate_format, "pfx");
        assert_eq!(STANDARD.decode(&doc.data).unwrap(), TEST_PEM.as_bytes());

        let xml = String::from_utf8(asm_api::to_xml(&doc).unwrap()).unwrap();
        assert!(xml.starts_with("<CertificateFile xmlns="));
        assert!(!xml.contains("<Password>"));
    }
}
