//! Shared fixtures: certificate authorities and a ready-to-use ledger

#![allow(dead_code)]

use ballot_ledger::{MemoryLedger, VoteContract};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
};

/// A certificate authority for one organization
pub struct Org {
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl Org {
    /// CA whose certificates carry issuer `O=<short_name>.example.com`
    pub fn new(short_name: &str) -> Self {
        Self::with_issuer_org(&format!("{short_name}.example.com"))
    }

    pub fn with_issuer_org(organization: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, format!("ca.{organization}"));
        dn.push(DnType::OrganizationName, organization);
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = params.self_signed(&ca_key).unwrap();
        Self { ca_cert, ca_key }
    }

    /// Serialized identity for `user`: an MSP header followed by the PEM
    pub fn member(&self, user: &str) -> Vec<u8> {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, user);
        params.distinguished_name = dn;

        let key = KeyPair::generate().unwrap();
        let pem = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .unwrap()
            .pem();

        let mut framed = b"\n\x07Org1MSP\x12\x80\x06".to_vec();
        framed.extend_from_slice(pem.as_bytes());
        framed
    }
}

/// Certificate bytes for `user` issued by a fresh CA of `org`
pub fn cert_for(user: &str, org: &str) -> Vec<u8> {
    Org::new(org).member(user)
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Default contract and a ledger initialized with `allowed`
pub fn initialized(allowed: &[&str]) -> (VoteContract, MemoryLedger) {
    let contract = VoteContract::for_testing();
    let mut ledger = MemoryLedger::new();
    let response = contract.init(&mut ledger, &strings(allowed));
    assert!(response.is_ok(), "init failed: {}", response.message);
    (contract, ledger)
}
