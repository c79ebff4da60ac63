//! Common functionality shared across commands

use std::path::PathBuf;

use clap::Args;

/// Arguments shared by every command that reads a snapshot
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Snapshot file with environments, modules and resources (JSON)
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "INFRAVIZ_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Generic builder trait for configuration objects
pub trait ConfigBuilder: Sized {
    type Config;

    /// Build the configuration, returning an error if validation fails
    fn build(self) -> Result<Self::Config, crate::error::InfravizError>;
}

/// Trait for configurations that can be created from CLI commands
pub trait FromCommand: Sized {
    fn from_command(command: crate::cli::Commands) -> Result<Self, crate::error::InfravizError>;
}

/// Macro to implement `TryFrom<Commands>` using [`FromCommand`] trait
#[macro_export]
macro_rules! impl_try_from_command {
    ($config:ty) => {
        impl std::convert::TryFrom<$crate::cli::Commands> for $config {
            type Error = $crate::error::InfravizError;

            fn try_from(command: $crate::cli::Commands) -> Result<Self, Self::Error> {
                <$config as $crate::common::FromCommand>::from_command(command)
            }
        }
    };
}

/// Generate a `with_*` builder whose `build` fails on any unset field
#[macro_export]
macro_rules! impl_builder {
    ($builder:ident => $target:ident { $($field:ident : $ty:ty => $setter:ident),* $(,)? }) => {
        #[derive(Default)]
        pub struct $builder {
            $($field: Option<$ty>,)*
        }

        impl $builder {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $setter(mut self, $field: $ty) -> Self {
                    self.$field = Some($field);
                    self
                }
            )*
        }

        impl $crate::common::ConfigBuilder for $builder {
            type Config = $target;

            fn build(self) -> Result<Self::Config, $crate::error::InfravizError> {
                Ok($target {
                    $(
                        $field: self.$field.ok_or_else(|| {
                            $crate::error::InfravizError::ConfigurationError {
                                message: format!(
                                    "Missing required field: {}",
                                    stringify!($field)
                                ),
                            }
                        })?,
                    )*
                })
            }
        }
    };
}
