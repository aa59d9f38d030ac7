use indexmap::IndexMap;
use metrics::Label;

/// Tag key for the application name.
pub const APPLICATION_TAG_KEY: &str = "application";

/// Tag key for the service name.
pub const SERVICE_TAG_KEY: &str = "service";

/// Tag key for the cluster name.
pub const CLUSTER_TAG_KEY: &str = "cluster";

/// Tag key for the shard name.
pub const SHARD_TAG_KEY: &str = "shard";

/// Value used for an application tag that was never set.
pub const NULL_TAG_VALUE: &str = "null";

const RESERVED_TAG_KEYS: [&str; 4] =
    [APPLICATION_TAG_KEY, SERVICE_TAG_KEY, CLUSTER_TAG_KEY, SHARD_TAG_KEY];

/// Metadata identifying the application that emits the metrics.
///
/// Every point sent by a reporter carries these as point tags, which is how Wavefront groups metrics by application,
/// service, cluster, and shard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationTags {
    application: Option<String>,
    service: Option<String>,
    cluster: Option<String>,
    shard: Option<String>,
    custom_tags: Vec<(String, String)>,
}

impl ApplicationTags {
    /// Creates `ApplicationTags` for the given application and service.
    pub fn new<A, S>(application: A, service: S) -> Self
    where
        A: Into<String>,
        S: Into<String>,
    {
        ApplicationTags {
            application: Some(application.into()),
            service: Some(service.into()),
            ..Default::default()
        }
    }

    /// Sets the cluster name.
    #[must_use]
    pub fn with_cluster<C: Into<String>>(mut self, cluster: C) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Sets the shard name.
    #[must_use]
    pub fn with_shard<S: Into<String>>(mut self, shard: S) -> Self {
        self.shard = Some(shard.into());
        self
    }

    /// Adds a custom tag.
    ///
    /// Custom tags cannot override the `application`, `service`, `cluster`, or `shard` tags. Adding a custom tag with
    /// a key that was already added replaces the earlier value.
    #[must_use]
    pub fn with_custom_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();
        match self.custom_tags.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.custom_tags.push((key, value)),
        }
        self
    }

    /// Returns the application name, if set.
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    /// Returns the service name, if set.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Returns the cluster name, if set.
    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    /// Returns the shard name, if set.
    pub fn shard(&self) -> Option<&str> {
        self.shard.as_deref()
    }

    /// Returns the custom tags, in insertion order.
    pub fn custom_tags(&self) -> &[(String, String)] {
        &self.custom_tags
    }

    /// Flattens these application tags into the tags applied to every point.
    pub fn to_global_tags(&self) -> GlobalTags {
        let value_or_null = |value: &Option<String>| value.as_deref().unwrap_or(NULL_TAG_VALUE).to_string();

        let mut tags = IndexMap::with_capacity(RESERVED_TAG_KEYS.len() + self.custom_tags.len());
        tags.insert(APPLICATION_TAG_KEY.to_string(), value_or_null(&self.application));
        tags.insert(SERVICE_TAG_KEY.to_string(), value_or_null(&self.service));
        tags.insert(CLUSTER_TAG_KEY.to_string(), value_or_null(&self.cluster));
        tags.insert(SHARD_TAG_KEY.to_string(), value_or_null(&self.shard));

        for (key, value) in &self.custom_tags {
            if RESERVED_TAG_KEYS.contains(&key.as_str()) {
                continue;
            }
            tags.insert(key.clone(), value.clone());
        }

        GlobalTags { tags }
    }
}

/// Tags applied uniformly to every point sent by a reporter.
///
/// Built once from [`ApplicationTags`] and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalTags {
    tags: IndexMap<String, String>,
}

impl GlobalTags {
    /// Gets the value of the given tag key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns `true` if the given tag key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates over the tags in the order they are applied.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Converts the tags into `metrics` labels.
    pub fn to_labels(&self) -> Vec<Label> {
        self.tags.iter().map(|(k, v)| Label::new(k.clone(), v.clone())).collect()
    }
}
