mod billing_config_provider;

pub use billing_config_provider::BillingConfigProvider;
