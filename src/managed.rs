//! Managed-runtime interface (JVM).
//!
//! The virtual machine is a process-wide singleton created lazily with a
//! fixed classpath and heap configuration; it cannot be re-created after
//! teardown, so it is never torn down. Because managed overloads are
//! distinguished by return type as well as argument types and the call site
//! supplies neither, each call derives an argument-type signature fragment
//! from the runtime values and probes a prioritized list of candidate return
//! types, clearing the pending fault of every failed attempt.

use jni::objects::{GlobalRef, JObject, JString, JValue, JValueOwned};
use jni::{AttachGuard, InitArgsBuilder, JNIVersion, JavaVM};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::registry::{LibraryInterface, LibraryKind};
use crate::value::Value;

/// Directory appended to the virtual machine's classpath alongside the
/// working directory.
pub const CLASS_DIR: &str = "./java_modules";

/// Candidate return types, most common first. `V` last so a void method is
/// only matched when nothing value-returning exists.
const RETURN_CANDIDATES: [&str; 6] = ["D", "Ljava/lang/String;", "Z", "J", "I", "V"];

/// Signatures probed by the existence check. Existence only; the probe is
/// not argument-shape-aware.
const PROBE_SIGNATURES: [&str; 12] = [
    "()D",
    "()Ljava/lang/String;",
    "()Z",
    "()I",
    "()J",
    "()V",
    "(D)D",
    "(Ljava/lang/String;)Ljava/lang/String;",
    "(I)Z",
    "(DD)D",
    "(II)I",
    "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
];

static RUNTIME: OnceCell<ManagedRuntime> = OnceCell::new();

/// Process-wide virtual machine context.
pub struct ManagedRuntime {
    vm: JavaVM,
}

impl ManagedRuntime {
    /// Returns the singleton, creating the virtual machine on first use.
    ///
    /// A failed creation leaves the cell empty so a later bind may retry;
    /// once created the machine lives until process teardown.
    pub fn global() -> Result<&'static ManagedRuntime, BridgeError> {
        RUNTIME.get_or_try_init(|| {
            let separator = if cfg!(windows) { ';' } else { ':' };
            let args = InitArgsBuilder::new()
                .version(JNIVersion::V8)
                .option(format!("-Djava.class.path=.{separator}{CLASS_DIR}"))
                .option("-Xmx512m")
                .option("-Xms256m")
                .build()
                .map_err(|err| BridgeError::load("jvm", err.to_string()))?;
            let vm = JavaVM::new(args)
                .map_err(|err| BridgeError::load("jvm", err.to_string()))?;
            info!("managed runtime initialized");
            Ok(ManagedRuntime { vm })
        })
    }

    fn attach(&self) -> Result<AttachGuard<'_>, BridgeError> {
        self.vm
            .attach_current_thread()
            .map_err(|err| BridgeError::invocation("attach", err.to_string()))
    }
}

/// One resolved class, pinned for the lifetime of the binding.
pub struct ManagedClass {
    runtime: &'static ManagedRuntime,
    /// Keeps the class from being collected while the binding lives.
    #[allow(dead_code)]
    pinned: GlobalRef,
    /// Internal (slash-separated) class name used for lookups.
    class_name: String,
}

impl ManagedClass {
    /// Resolves `name` (dotted or internal form) and pins it.
    pub fn load(name: &str) -> Result<Self, BridgeError> {
        let runtime = ManagedRuntime::global()?;
        let class_name = name.replace('.', "/");
        let mut env = runtime.attach()?;
        let class = match env.find_class(class_name.as_str()) {
            Ok(class) => class,
            Err(err) => {
                let _ = env.exception_clear();
                return Err(BridgeError::load(name, err.to_string()));
            }
        };
        let pinned = env
            .new_global_ref(&class)
            .map_err(|err| BridgeError::load(name, err.to_string()))?;
        debug!(class = %class_name, "resolved managed class");
        Ok(Self {
            runtime,
            pinned,
            class_name,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl LibraryInterface for ManagedClass {
    fn kind(&self) -> LibraryKind {
        LibraryKind::ManagedRuntime
    }

    fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, BridgeError> {
        let mut env = self.runtime.attach()?;

        // Argument-type fragment derived from the runtime values. Text
        // arguments become local references owned by the attach guard, so
        // they are released on every exit path.
        let mut fragment = String::from("(");
        let mut owned: Vec<JValueOwned> = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Value::Number(n) => {
                    fragment.push('D');
                    owned.push(JValueOwned::Double(*n));
                }
                Value::Text(s) => {
                    fragment.push_str("Ljava/lang/String;");
                    let text = env
                        .new_string(s)
                        .map_err(|err| BridgeError::invocation(function, err.to_string()))?;
                    owned.push(JValueOwned::Object(JObject::from(text)));
                }
                Value::Bool(b) => {
                    fragment.push('Z');
                    owned.push(JValueOwned::Bool(u8::from(*b)));
                }
                _ => {
                    fragment.push_str("Ljava/lang/Object;");
                    owned.push(JValueOwned::Object(JObject::null()));
                }
            }
        }
        fragment.push(')');

        for candidate in RETURN_CANDIDATES {
            let signature = format!("{fragment}{candidate}");
            let borrowed: Vec<JValue> = owned.iter().map(|value| value.borrow()).collect();
            match env.call_static_method(
                self.class_name.as_str(),
                function,
                signature.as_str(),
                &borrowed,
            ) {
                Ok(result) => return convert_return(&mut env, function, result),
                Err(_) => {
                    // Wrong-return-type attempt or a thrown exception; clear
                    // the fault and try the next candidate.
                    if env.exception_check().unwrap_or(false) {
                        let _ = env.exception_clear();
                    }
                }
            }
        }
        Err(BridgeError::MethodNotFound(function.to_string()))
    }

    fn has_function(&self, function: &str) -> bool {
        let Ok(mut env) = self.runtime.attach() else {
            return false;
        };
        for signature in PROBE_SIGNATURES {
            match env.get_static_method_id(self.class_name.as_str(), function, signature) {
                Ok(_) => return true,
                Err(_) => {
                    if env.exception_check().unwrap_or(false) {
                        let _ = env.exception_clear();
                    }
                }
            }
        }
        false
    }
}

fn convert_return(
    env: &mut jni::JNIEnv<'_>,
    function: &str,
    result: JValueOwned<'_>,
) -> Result<Value, BridgeError> {
    match result {
        JValueOwned::Double(d) => Ok(Value::Number(d)),
        JValueOwned::Long(j) => Ok(Value::Number(j as f64)),
        JValueOwned::Int(i) => Ok(Value::Number(f64::from(i))),
        JValueOwned::Bool(b) => Ok(Value::Bool(b != 0)),
        JValueOwned::Void => Ok(Value::Nil),
        JValueOwned::Object(obj) => {
            if obj.is_null() {
                return Ok(Value::Text(String::new()));
            }
            let text = JString::from(obj);
            env.get_string(&text)
                .map(|s| Value::Text(String::from(s)))
                .map_err(|err| BridgeError::invocation(function, err.to_string()))
        }
        JValueOwned::Byte(b) => Ok(Value::Number(f64::from(b))),
        JValueOwned::Short(s) => Ok(Value::Number(f64::from(s))),
        JValueOwned::Char(c) => Ok(Value::Number(f64::from(c))),
        JValueOwned::Float(f) => Ok(Value::Number(f64::from(f))),
    }
}
