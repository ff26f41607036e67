//! Error types.
//!
//! Every variant is a load-time failure: either the configuration is wrong, or a record could not
//! be bound to a resolver. Nothing here is produced on the query path, where an unhealthy answer
//! is reported through the [`Sttl`][crate::monitor::Sttl] down flag instead.

use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible Meta Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a plugin section of the config document is missing or isn't an object.
    #[error("plugin '{0}': configuration must be an object")]
    MissingConfig(String),

    /// Returned when a plugin section names a plugin that Meta Crab doesn't provide.
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// Returned for structural problems in a plugin's configuration that don't warrant their own
    /// variant, e.g. a value of the wrong type.
    #[error("plugin '{plugin}': {message}")]
    InvalidConfig { plugin: String, message: String },

    /// Returned when a meta plugin's config has no `resources` object.
    #[error("plugin '{0}': config has no 'resources' stanza")]
    MissingResources(String),

    /// Returned when more resources are configured than fit in the low 24 bits of a handle.
    #[error("plugin '{plugin}': maximum number of resources ({max}) exceeded")]
    TooManyResources { plugin: String, max: usize },

    /// Returned when a resource name contains `/`, which delimits pinned datacenter lookups.
    #[error("plugin '{plugin}': resource name '{resource}' must not contain '/'")]
    InvalidResourceName { plugin: String, resource: String },

    /// Returned when a resource has no `dcmap` object.
    #[error("plugin '{plugin}': resource '{resource}': missing required stanza 'dcmap'")]
    MissingDcMap { plugin: String, resource: String },

    /// Returned when the `dcmap` doesn't cover exactly the datacenters of the resource's map.
    #[error(
        "plugin '{plugin}': resource '{resource}': the dcmap has {configured} datacenters, \
         the datacenters list has {expected}"
    )]
    DcMapMismatch {
        plugin: String,
        resource: String,
        configured: usize,
        expected: usize,
    },

    /// Returned when a `dcmap` key isn't a datacenter of the resource's map.
    #[error("plugin '{plugin}': resource '{resource}': datacenter name '{datacenter}' is not valid")]
    UnknownDatacenter {
        plugin: String,
        resource: String,
        datacenter: String,
    },

    /// Returned when a `%plugin` delegate entry has no `!resource` part.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': \
         delegate '%{target}' needs a resource name ('%{target}!resource')"
    )]
    MissingDelegateResource {
        plugin: String,
        resource: String,
        datacenter: String,
        target: String,
    },

    /// Returned when a delegate entry points back at the resource that contains it.
    #[error("plugin '{plugin}': resource '{resource}': not allowed to reference itself")]
    SelfReference { plugin: String, resource: String },

    /// Returned when a synthesized sub-resolver config would target the synthesizing plugin.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': \
         cannot synthesize config for itself"
    )]
    SelfSynthesis {
        plugin: String,
        resource: String,
        datacenter: String,
    },

    /// Returned when the synthesized resource name is already configured for the target plugin.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': synthesis of \
         resource '{child}' for plugin '{target}' failed (resource name already exists)"
    )]
    SynthesizedNameExists {
        plugin: String,
        resource: String,
        datacenter: String,
        child: String,
        target: String,
    },

    /// Returned when synthesis targets a plugin whose configuration has already been loaded.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': cannot synthesize \
         config for plugin '{target}', it is loaded before '{plugin}'"
    )]
    SynthesisAfterLoad {
        plugin: String,
        resource: String,
        datacenter: String,
        target: String,
    },

    /// Returned when a direct name target isn't a legal domain name.
    #[error(
        "plugin '{plugin}': resource '{resource}': CNAME for datacenter '{datacenter}' \
         is not a legal domainname: '{name}'"
    )]
    InvalidDomainName {
        plugin: String,
        resource: String,
        datacenter: String,
        name: String,
    },

    /// Returned when `service_types` isn't a string or a list of strings.
    #[error("plugin '{plugin}': resource '{resource}': service_types values must be strings")]
    InvalidServiceTypes { plugin: String, resource: String },

    /// Returned when a record or delegate names a resource the plugin doesn't have.
    #[error("plugin '{plugin}': invalid resource name '{resource}'")]
    UnknownResource { plugin: String, resource: String },

    /// Returned when a pinned lookup (`resource/datacenter`) names an unknown datacenter.
    #[error(
        "plugin '{plugin}': synthetic resource '{resource}/{datacenter}': \
         datacenter '{datacenter}' does not exist for this resource"
    )]
    UnknownPinnedDatacenter {
        plugin: String,
        resource: String,
        datacenter: String,
    },

    /// Returned when a resource with a direct name target is used by an address-only record.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}' is configured as \
         the fixed CNAME '{name}', therefore this resource cannot be used in an address-only record"
    )]
    CnameInAddressContext {
        plugin: String,
        resource: String,
        datacenter: String,
        name: String,
    },

    /// Returned when completing a partial name with a record's origin gives an invalid name.
    #[error(
        "plugin '{plugin}': name '{name}' of resource '{resource}', when used at origin \
         '{origin}', produces an invalid domainname"
    )]
    InvalidCompletion {
        plugin: String,
        resource: String,
        name: String,
        origin: String,
    },

    /// Returned when a delegate names a plugin that isn't loaded.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': \
         invalid plugin name '{target}'"
    )]
    InvalidPluginName {
        plugin: String,
        resource: String,
        datacenter: String,
        target: String,
    },

    /// Returned when a delegate's sub-resolver rejects its resource for an address-only record.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': plugin '{target}' \
         rejected address-only resource name '{target_resource}'"
    )]
    DelegateRejectedAddress {
        plugin: String,
        resource: String,
        datacenter: String,
        target: String,
        target_resource: String,
        #[source]
        source: Box<Error>,
    },

    /// Returned when a delegate's sub-resolver rejects its resource for a name-producing record.
    #[error(
        "plugin '{plugin}': resource '{resource}': datacenter '{datacenter}': plugin '{target}' \
         rejected resource name '{target_resource}' at origin '{origin}'"
    )]
    DelegateRejectedName {
        plugin: String,
        resource: String,
        datacenter: String,
        target: String,
        target_resource: String,
        origin: String,
        #[source]
        source: Box<Error>,
    },

    /// Returned when a record's resolver isn't of the form `plugin!resource`.
    #[error("record '{0}': resolver must be of the form 'plugin!resource'")]
    InvalidResolver(String),

    /// Returned when an admin state value can't be parsed, e.g. `SIDEWAYS/30`.
    #[error("invalid health state '{0}', expected UP, DOWN, UP/<ttl> or DOWN/<ttl>")]
    InvalidState(String),

    /// Returned when an admin state names a monitor slot that was never registered.
    #[error("no monitored service or admin slot named '{0}'")]
    UnknownMonitor(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [loading a `Config`][crate::config::Config::try_from_file] fails due to
    /// invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a configured domain name (e.g. the zone origin) can't be parsed.
    #[error("invalid domain name")]
    DomainName(#[from] ProtoError),
}
