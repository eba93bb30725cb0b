// ------------------------------
// region Print
// ------------------------------

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn print_version() {
    let name = r#"                       _
  __ _  ___ __ _ _   _(_)_ __ ___
 / _` |/ __/ _` | | | | | '__/ _ \
| (_| | (_| (_| | |_| | | | |  __/
 \__,_|\___\__, |\__,_|_|_|  \___|
              |_|
"#
    .to_string()
    .rgb(231, 112, 13);
    println!("{name}");
    println!("acquire - {DESCRIPTION}\nVersion {VERSION}");
    println!("{}", String::from(" ").default());
}

pub trait RGBColorTextExt {
    fn rgb(&self, r: u8, g: u8, b: u8) -> String;
    fn default(&self) -> String;
}

impl RGBColorTextExt for String {
    fn rgb(&self, r: u8, g: u8, b: u8) -> String {
        format!("\x1b[38;2;{r};{g};{b}m{self}")
    }

    fn default(&self) -> String {
        format!("\x1b[39m{self}")
    }
}
// endregion

// ------------------------------
// region Macro
// ------------------------------

// Add `name` method to enum variant
#[macro_export]
macro_rules! enum_str {
    // basic version
    (
        enum $name:ident {
            $($variant:ident = $val:expr),*
            $(,)* // optional trailing comma
        }
    ) => {
        enum $name {
            $($variant = $val),*
        }

        impl $name {
            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),*
                }
            }
        }
    };
    // enum with #[derive], variants may carry their own attributes (e.g. clap's #[value(..)])
    (
        #[derive($($der:ident),* $(,)*)]
        $vis:vis enum $name:ident {
            $($(#[$variant_attr:meta])* $variant:ident = $val:expr),*
            $(,)* // optional trailing comma
        }
    ) => {
        #[derive($($der),*)]
        $vis enum $name {
            $($(#[$variant_attr])* $variant = $val),*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

// endregion
