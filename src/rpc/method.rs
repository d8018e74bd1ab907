//! Method names and their wire strings

/// An enumeration whose values map one-to-one onto wire strings.
pub trait WireName: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn wire_name(self) -> &'static str;

    fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|value| value.wire_name() == name)
    }
}

/// Declares an enum together with its [`WireName`] table.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::rpc::method::WireName for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn wire_name(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::rpc::method::WireName::wire_name(*self))
            }
        }
    };
}

wire_enum! {
    /// Protocol-level methods handled before feature routing
    pub enum ControlMethod {
        CancelRequest => "$/cancelRequest",
        Progress => "$/progress",
    }
}

wire_enum! {
    /// Methods this server routes to handlers
    pub enum LspMethod {
        Initialize => "initialize",
        Initialized => "initialized",
        Shutdown => "shutdown",
        Exit => "exit",
        DidOpen => "textDocument/didOpen",
        DidChange => "textDocument/didChange",
        DidClose => "textDocument/didClose",
        Hover => "textDocument/hover",
    }
}
