//! Helper macro for port errors whose variants all carry a message.

/// Declare an error enum where every variant wraps a `message: String`.
///
/// Each variant gets a snake-case constructor accepting `impl Into<String>`,
/// its `Display` output is `"{prefix}: {message}"`, and `message()` returns
/// the bare message for user-facing surfaces.
macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $prefix:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error("{}: {}", $prefix, .message)]
                $variant {
                    /// Detail describing the failure.
                    message: String,
                },
            )*
        }

        impl $name {
            ::paste::paste! {
                $(
                    #[doc = "Build a `" $variant "` error."]
                    pub fn [<$variant:snake>](message: impl Into<String>) -> Self {
                        Self::$variant { message: message.into() }
                    }
                )*
            }

            /// The message without the variant prefix.
            pub fn message(&self) -> &str {
                match self {
                    $(Self::$variant { message })|* => message,
                }
            }
        }
    };
}

pub(crate) use define_port_error;
