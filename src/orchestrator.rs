//! Multi-provider operations: list, download and remove.
//!
//! Providers are tried in configured order.  Only "this provider does not have the dataset" moves
//! on to the next provider; every other outcome, success or failure, is final for that dataset.

use crate::{
    Result,
    config::Config,
    dataset_ref::DatasetRef,
    error,
    messages::MessageReporter,
    providers::{CachedDataset, NamedProvider, Provider, ProviderKind, make_provider},
    version::{Version, VersionSelector},
};

/// The catalog of one dataset as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetListing {
    pub name: String,

    /// Newest first
    pub versions: Vec<Version>,

    pub latest: Option<Version>,
}

/// Everything one provider (or its local cache) has to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderListing {
    pub provider: String,
    pub kind: ProviderKind,
    pub location: String,

    /// Whether this lists the provider's local cache rather than its remote catalog
    pub local: bool,

    pub datasets: Vec<DatasetListing>,
}

/// A successful download: which provider served it and where it landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub provider: String,
    pub dataset: CachedDataset,
}

/// Per-dataset outcomes of a `download`, in request order.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub items: Vec<(DatasetRef, Result<Downloaded>)>,
}

impl DownloadReport {
    pub fn failures(&self) -> usize {
        self.items.iter().filter(|(_, result)| result.is_err()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

/// Outcome of removing one version, or of a request that failed before any version was chosen
/// (then `version` is `None`).
#[derive(Debug)]
pub struct RemoveOutcome {
    pub name: String,
    pub version: Option<Version>,
    pub result: Result<()>,
}

/// Per-version outcomes of a `remove`.
#[derive(Debug, Default)]
pub struct RemoveReport {
    /// The local directory the removals applied to
    pub location: String,
    pub items: Vec<RemoveOutcome>,
}

impl RemoveReport {
    pub fn failures(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_err()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

/// The ordered providers of one invocation.
#[derive(Debug)]
pub struct Orchestrator {
    providers: Vec<NamedProvider>,
}

impl Orchestrator {
    pub fn new(providers: Vec<NamedProvider>) -> Self {
        Self { providers }
    }

    /// Build every configured provider, or only the one named `selection`.
    pub fn from_config(config: &Config, selection: Option<&str>, reporter: &MessageReporter) -> Result<Self> {
        let mut configs = config.provider_configs();

        if let Some(selection) = selection {
            let available: Vec<String> = configs.iter().map(|c| c.name.clone()).collect();
            configs.retain(|c| c.name == selection);
            if configs.is_empty() {
                return error::UnknownProviderSnafu {
                    name: selection,
                    available,
                }
                .fail();
            }
        }

        let providers = configs
            .iter()
            .map(|provider_config| {
                Ok(NamedProvider {
                    name: provider_config.name.clone(),
                    provider: make_provider(provider_config, config, reporter)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(providers))
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name.as_str())
    }

    /// List the catalog of every provider, or with `local_only` the local caches of the remote
    /// ones.
    ///
    /// A provider answering [`DatasetNotFound`](error::Error::DatasetNotFound) is skipped; any
    /// other error aborts the whole listing.
    pub fn list(&self, local_only: bool) -> Result<Vec<ProviderListing>> {
        let mut listings = Vec::with_capacity(self.providers.len());

        for named in &self.providers {
            let view: &dyn Provider = match named.provider.local_view() {
                Some(cache) if local_only => cache,
                _ => named.provider.as_ref(),
            };
            let local = view.kind() == ProviderKind::Local;

            match list_provider(view) {
                Ok(datasets) => listings.push(ProviderListing {
                    provider: named.name.clone(),
                    kind: named.provider.kind(),
                    location: view.location(),
                    local,
                    datasets,
                }),
                Err(e) if e.is_dataset_not_found() => {
                    tracing::debug!("Skipping provider '{}': {}", named.name, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(listings)
    }

    /// Download each requested dataset from the first provider that has it.
    ///
    /// Every request gets its own outcome; one failure never stops the others.
    pub fn download(&self, requests: &[DatasetRef], force_update: bool) -> DownloadReport {
        let items = requests
            .iter()
            .map(|request| (request.clone(), self.download_one(request, force_update)))
            .collect();

        DownloadReport { items }
    }

    fn download_one(&self, request: &DatasetRef, force_update: bool) -> Result<Downloaded> {
        for named in &self.providers {
            tracing::debug!("Looking for {} in provider '{}'", request, named.name);

            match named
                .provider
                .get_folder(&request.name, &request.selector, force_update)
            {
                Ok(dataset) => {
                    return Ok(Downloaded {
                        provider: named.name.clone(),
                        dataset,
                    });
                }
                Err(e) if e.is_dataset_not_found() => {
                    tracing::info!("Dataset {} not in provider '{}'", request.name, named.name);
                }
                Err(e) => return Err(e),
            }
        }

        error::DatasetNotFoundSnafu {
            name: request.name.clone(),
            location: format!(
                "any configured provider ({})",
                self.provider_names().collect::<Vec<_>>().join(", ")
            ),
        }
        .fail()
    }

    /// Remove cached datasets from the local view of the first provider.
    ///
    /// A bare name removes every cached version, `name:selector` the versions the selector
    /// matches, and `name:latest` only the newest one.  With `all`, `requests` is ignored and every
    /// cached dataset is removed.  Only enumerating the datasets for `all` can fail the whole call.
    pub fn remove(&self, requests: &[DatasetRef], all: bool) -> Result<RemoveReport> {
        let Some(first) = self.providers.first() else {
            return Ok(RemoveReport::default());
        };

        let view: &dyn Provider = match first.provider.local_view() {
            Some(cache) => cache,
            None => first.provider.as_ref(),
        };

        let requests = if all {
            view.list_datasets()?
                .into_iter()
                .map(|name| DatasetRef {
                    name,
                    selector: VersionSelector::Latest,
                    explicit_version: false,
                })
                .collect()
        } else {
            requests.to_vec()
        };

        let mut report = RemoveReport {
            location: view.location(),
            items: Vec::new(),
        };

        for request in &requests {
            let targets = match removal_targets(view, request) {
                Ok(targets) => targets,
                Err(e) => {
                    report.items.push(RemoveOutcome {
                        name: request.name.clone(),
                        version: None,
                        result: Err(e),
                    });
                    continue;
                }
            };

            for version in targets {
                // Deleting through the provider itself keeps its bookkeeping (messages) intact
                let result = first.provider.del_folder(&request.name, &version);
                if let Err(ref e) = result {
                    tracing::warn!("Failed to remove {} {}: {}", request.name, version, e);
                }
                report.items.push(RemoveOutcome {
                    name: request.name.clone(),
                    version: Some(version),
                    result,
                });
            }
        }

        Ok(report)
    }
}

fn list_provider(provider: &dyn Provider) -> Result<Vec<DatasetListing>> {
    let mut names = provider.list_datasets()?;
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let mut versions = provider.list_versions(&name)?;
            versions.sort_by(|a, b| b.cmp(a));
            let latest = if versions.is_empty() {
                None
            } else {
                Some(provider.get_version(&name, &VersionSelector::Latest, &versions)?)
            };
            Ok(DatasetListing {
                name,
                versions,
                latest,
            })
        })
        .collect()
}

/// The cached versions `request` asks to remove, newest first.
fn removal_targets(view: &dyn Provider, request: &DatasetRef) -> Result<Vec<Version>> {
    let mut versions = view.list_versions(&request.name)?;
    versions.sort_by(|a, b| b.cmp(a));

    if !request.explicit_version {
        return Ok(versions);
    }

    match &request.selector {
        VersionSelector::Latest => Ok(vec![view.get_version(&request.name, &request.selector, &versions)?]),
        selector => {
            let matching: Vec<Version> = versions.iter().filter(|v| selector.matches(v)).cloned().collect();
            if matching.is_empty() {
                // Produces the precise not-found error for this selector
                view.get_version(&request.name, selector, &versions)?;
            }
            Ok(matching)
        }
    }
}
