// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gno sources deployed by the runtimes and the messages that carry them

use crate::types::{Address, MemFile, MemPackage, Msg, MsgAddPackage, MsgCall};

pub const REALM_PATH_PREFIX: &str = "gno.land/r";
pub const PACKAGE_PATH_PREFIX: &str = "gno.land/p";

/// Realm function invoked by realm call traffic
pub const REALM_METHOD: &str = "SayHello";

const PACKAGE_NAME: &str = "runtime";
const REALM_FILE_NAME: &str = "realm.gno";
const PACKAGE_FILE_NAME: &str = "package.gno";
const GNOMOD_FILE_NAME: &str = "gnomod.toml";

const REALM_BODY: &str = r#"package runtime

var greeting string

func init() {
	greeting = "Hello"
}

// SayHello says hello to the specified name, using
// the saved greeting
func SayHello(name string) string {
	return greeting + " " + name + "!"
}
"#;

const PACKAGE_BODY: &str = r#"package runtime

type Language string

const (
	French    Language = "french"
	Italian   Language = "italian"
	Spanish   Language = "spanish"
	Hindi     Language = "hindi"
	Bulgarian Language = "bulgarian"
	Serbian   Language = "serbian"
)

// GetGreeting generates a greeting in
// the specified language
func GetGreeting(language Language) string {
	switch language {
	case French:
		return "Bonjour"
	case Italian:
		return "Ciao"
	case Spanish:
		return "Hola"
	case Hindi:
		return "नमस्ते"
	case Bulgarian:
		return "Здравейте"
	case Serbian:
		return "Здраво"
	default:
		return "Hello"
	}
}
"#;

const GNOMOD_BODY: &str = r#"
module = "gno.land/r/demo/runtime"
gno = "0.9"
"#;

/// Which source a package deployment publishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageKind {
    Realm,
    Package,
}

impl PackageKind {
    pub fn path_prefix(self) -> &'static str {
        match self {
            PackageKind::Realm => REALM_PATH_PREFIX,
            PackageKind::Package => PACKAGE_PATH_PREFIX,
        }
    }

    fn source(self) -> MemFile {
        match self {
            PackageKind::Realm => MemFile {
                name: REALM_FILE_NAME.to_string(),
                body: REALM_BODY.to_string(),
            },
            PackageKind::Package => MemFile {
                name: PACKAGE_FILE_NAME.to_string(),
                body: PACKAGE_BODY.to_string(),
            },
        }
    }
}

/// `{prefix}/{creator}/stress_{timestamp}_{index}`
pub fn deployment_path(kind: PackageKind, creator: &Address, timestamp: i64, index: usize) -> String {
    format!("{}/{creator}/stress_{timestamp}_{index}", kind.path_prefix())
}

/// `gno.land/r/{deployer}/stress_{timestamp}`, the realm targeted by calls
pub fn realm_call_path(deployer: &Address, timestamp: i64) -> String {
    format!("{REALM_PATH_PREFIX}/{deployer}/stress_{timestamp}")
}

pub fn add_package_msg(kind: PackageKind, creator: Address, path: String) -> Msg {
    Msg::AddPackage(MsgAddPackage {
        creator,
        package: MemPackage {
            name: PACKAGE_NAME.to_string(),
            path,
            files: vec![
                MemFile {
                    name: GNOMOD_FILE_NAME.to_string(),
                    body: GNOMOD_BODY.to_string(),
                },
                kind.source(),
            ],
        },
    })
}

pub fn realm_call_msg(caller: Address, realm_path: &str, index: usize) -> Msg {
    Msg::Call(MsgCall {
        caller,
        pkg_path: realm_path.to_string(),
        func: REALM_METHOD.to_string(),
        args: vec![format!("Account-{index}")],
    })
}
