// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! TXT record lookups for DMARC, SPF, and DKIM names.

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use tracing::{debug, info};

use crate::Result;

pub const DNS_PORT: u16 = 53;

/// Returns the name of the DMARC record of `domain`, cf. RFC 7489, section 6.1.
pub fn dmarc_name(domain: &str) -> String {
    format!("_dmarc.{}", domain.trim_end_matches('.'))
}

/// Returns the name of the DKIM key record of `selector` for `domain`, cf. RFC 6376, section 3.6.2.1.
pub fn dkim_name(selector: &str, domain: &str) -> String {
    format!("{}._domainkey.{}", selector, domain.trim_end_matches('.'))
}

/// Source of TXT records. Implemented by `TxtLookup`; tests use static records.
pub trait TxtRecords {
    /// Returns all TXT strings at `name`; multi-string RDATA is concatenated. No records yield an empty `Vec`.
    fn txt_records(&self, name: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

#[derive(Debug, Clone)]
pub struct TxtLookupOpts {
    /// Uses the system's resolver configuration if empty
    pub nameservers: Vec<IpAddr>,
    pub timeout: Duration,
}

impl Default for TxtLookupOpts {
    fn default() -> Self {
        TxtLookupOpts {
            nameservers: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct TxtLookup {
    inner: TokioResolver,
}

impl TxtLookup {
    pub fn new(opts: TxtLookupOpts) -> Result<Self> {
        let mut builder = if opts.nameservers.is_empty() {
            debug!("Using system resolver configuration.");
            Resolver::builder_tokio()?
        } else {
            debug!("Using nameservers {:?}.", opts.nameservers);
            let group = NameServerConfigGroup::from_ips_clear(&opts.nameservers, DNS_PORT, true);
            let config = ResolverConfig::from_parts(None, vec![], group);
            Resolver::builder_with_config(config, TokioConnectionProvider::default())
        };
        builder.options_mut().timeout = opts.timeout;

        Ok(TxtLookup { inner: builder.build() })
    }
}

impl TxtRecords for TxtLookup {
    fn txt_records(&self, name: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        let resolver = self.inner.clone();
        let name = name.to_string();
        async move {
            info!("Looking up TXT records of '{}'.", name);
            let lookup = match resolver.txt_lookup(name.as_str()).await {
                Ok(lookup) => lookup,
                Err(e) if e.is_no_records_found() || e.is_nx_domain() => {
                    debug!("No TXT records found for '{}'.", name);
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e.into()),
            };
            let txts: Vec<String> = lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|data| String::from_utf8_lossy(data).to_string())
                        .collect::<String>()
                })
                .collect();
            debug!("Found {} TXT records for '{}'.", txts.len(), name);

            Ok(txts)
        }
    }
}
