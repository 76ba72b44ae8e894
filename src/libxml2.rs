//! Safe FFI wrapper around libxml2 for XSD compilation, XML document
//! parsing, and schema validation of in-memory documents.
//!
//! No mature pure-Rust XSD validator exists (roxmltree / quick-xml parse
//! but do not validate), so schema validation goes through libxml2
//! directly. Thread-safety rules (see http://xmlsoft.org/threads.html):
//!
//! - Schema **parsing** is NOT thread-safe and happens once at startup,
//!   before any concurrent work.
//! - **Validation** is thread-safe as long as each caller creates its own
//!   validation context; compiled schemas are read-only and shared.
//! - Parsing **different documents** concurrently is safe; each parse
//!   owns its own document tree.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int, c_ushort, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2.
///
/// libxml2's initialization is not thread-safe, so it is guarded by
/// `std::sync::Once` and performed exactly once per process.
static LIBXML2_INIT: Once = Once::new();

/// Schema parsing is not thread-safe in libxml2; serialize it
/// process-wide. Validation and document parsing are unaffected.
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

// Parse option bits from libxml2's xmlParserOption.
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NONET: c_int = 1 << 11;
const XML_PARSE_HUGE: c_int = 1 << 19;

// Node type discriminants from xmlElementType.
const XML_ELEMENT_NODE: c_int = 1;
const XML_TEXT_NODE: c_int = 3;
const XML_CDATA_SECTION_NODE: c_int = 4;

/// Opaque libxml2 structures.
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

/// Mirror of libxml2's `xmlNs` (tree.h). The layout is part of the
/// public libxml2 ABI and stable across releases.
#[repr(C)]
pub struct XmlNs {
    pub next: *mut XmlNs,
    pub type_: c_int,
    pub href: *const c_char,
    pub prefix: *const c_char,
    pub _private: *mut c_void,
    pub context: *mut XmlDoc,
}

/// Mirror of libxml2's `xmlNode` (tree.h), public ABI.
#[repr(C)]
pub struct XmlNode {
    pub _private: *mut c_void,
    pub type_: c_int,
    pub name: *const c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
    pub ns: *mut XmlNs,
    pub content: *mut c_char,
    pub properties: *mut c_void,
    pub ns_def: *mut XmlNs,
    pub psvi: *mut c_void,
    pub line: c_ushort,
    pub extra: c_ushort,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    fn xmlInitParser();

    // Schema compilation
    fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    fn xmlSchemaValidateDoc(ctxt: *const XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        sherr: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );

    // Document parsing
    fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    fn xmlFreeDoc(doc: *mut XmlDoc);
    fn xmlDocGetRootElement(doc: *const XmlDoc) -> *mut XmlNode;

    // Error introspection
    fn xmlGetLastError() -> *mut xmlError;
    fn xmlResetLastError();
}

/// Callback for libxml2 to report validation errors (structured).
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };

    if !error.is_null() {
        let msg_ptr = unsafe { (*error).message };
        if !msg_ptr.is_null() {
            let c_str = unsafe { CStr::from_ptr(msg_ptr) };
            if let Ok(s) = c_str.to_str() {
                errors.push(s.trim().to_string());
            }
        }
    }
}

/// Read the last parser error recorded by libxml2, if any.
fn last_error_message() -> Option<String> {
    unsafe {
        let err = xmlGetLastError();
        if err.is_null() {
            return None;
        }
        let msg_ptr = (*err).message;
        if msg_ptr.is_null() {
            return None;
        }
        CStr::from_ptr(msg_ptr)
            .to_str()
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Thread-safe handle to a compiled schema.
///
/// Compiled schemas are read-only after parsing and may be shared across
/// threads; the `Arc` guarantees `xmlSchemaFree` runs exactly once.
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 schema structures are thread-safe for reading after
// compilation (http://xmlsoft.org/threads.html).
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed by
    /// anyone else.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Owned handle to a parsed XML document tree.
///
/// The tree is never mutated after parsing, so sharing the handle across
/// threads for read-only traversal and validation is safe.
#[derive(Debug)]
pub struct XmlDocPtr {
    inner: Arc<XmlDocInner>,
}

#[derive(Debug)]
struct XmlDocInner {
    ptr: *mut XmlDoc,
}

// Safety: the tree is read-only after parsing.
unsafe impl Send for XmlDocInner {}
unsafe impl Sync for XmlDocInner {}

impl XmlDocPtr {
    fn as_ptr(&self) -> *mut XmlDoc {
        self.inner.ptr
    }

    /// Root element of the document, if present.
    pub fn root(&self) -> Option<XmlNodeRef<'_>> {
        let node = unsafe { xmlDocGetRootElement(self.inner.ptr) };
        if node.is_null() {
            None
        } else {
            Some(XmlNodeRef {
                ptr: node,
                _doc: PhantomData,
            })
        }
    }
}

impl Clone for XmlDocPtr {
    fn clone(&self) -> Self {
        XmlDocPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlDocInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Borrowed reference to a node inside an `XmlDocPtr`.
///
/// Lifetime-bound to the owning document so a node can never outlive its
/// tree.
#[derive(Clone, Copy)]
pub struct XmlNodeRef<'doc> {
    ptr: *const XmlNode,
    _doc: PhantomData<&'doc XmlDocPtr>,
}

impl<'doc> XmlNodeRef<'doc> {
    pub fn is_element(&self) -> bool {
        unsafe { (*self.ptr).type_ == XML_ELEMENT_NODE }
    }

    /// Local (prefix-stripped) element name.
    pub fn name(&self) -> &'doc str {
        unsafe {
            let name = (*self.ptr).name;
            if name.is_null() {
                ""
            } else {
                CStr::from_ptr(name).to_str().unwrap_or("")
            }
        }
    }

    /// Namespace URI of the element, if it is namespace-qualified.
    pub fn ns_href(&self) -> Option<&'doc str> {
        unsafe {
            let ns = (*self.ptr).ns;
            if ns.is_null() {
                return None;
            }
            let href = (*ns).href;
            if href.is_null() {
                return None;
            }
            CStr::from_ptr(href).to_str().ok()
        }
    }

    /// Iterator over all child nodes (elements, text, and others).
    pub fn children(&self) -> ChildIter<'doc> {
        ChildIter {
            next: unsafe { (*self.ptr).children },
            _doc: PhantomData,
        }
    }

    /// Iterator over element children only.
    pub fn element_children(&self) -> impl Iterator<Item = XmlNodeRef<'doc>> {
        self.children().filter(|n| n.is_element())
    }

    /// Concatenated text content of direct text/CDATA children.
    ///
    /// This deliberately does not recurse into child elements; the
    /// fiscalization format stores values directly in leaf elements.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            let ty = unsafe { (*child.ptr).type_ };
            if ty == XML_TEXT_NODE || ty == XML_CDATA_SECTION_NODE {
                let content = unsafe { (*child.ptr).content };
                if !content.is_null() {
                    if let Ok(s) = unsafe { CStr::from_ptr(content) }.to_str() {
                        out.push_str(s);
                    }
                }
            }
        }
        out
    }
}

/// Iterator over sibling nodes starting from a first child.
pub struct ChildIter<'doc> {
    next: *mut XmlNode,
    _doc: PhantomData<&'doc XmlDocPtr>,
}

impl<'doc> Iterator for ChildIter<'doc> {
    type Item = XmlNodeRef<'doc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }
        let current = self.next;
        self.next = unsafe { (*current).next };
        Some(XmlNodeRef {
            ptr: current,
            _doc: PhantomData,
        })
    }
}

/// Validation result from libxml2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with schema violations (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<String>,
    },
    /// Validator-internal error (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    pub fn from_code(code: c_int, errors: Vec<String>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }
}

/// Safe entry points into libxml2.
///
/// Creating a wrapper initializes libxml2 exactly once; instances are
/// cheap and stateless.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile an XSD schema from a file path.
    ///
    /// Using the file-path parser context makes libxml2 resolve relative
    /// `xs:include` / `xs:import` schema locations against the schema
    /// file's own directory, not the process working directory.
    pub fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        let path_str = path.to_str().ok_or(LibXml2Error::SchemaParseFailed)?;
        let c_path = CString::new(path_str).map_err(|_| LibXml2Error::SchemaParseFailed)?;

        let _guard = SCHEMA_PARSE_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        unsafe {
            let parser_ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);

            XmlSchemaPtr::from_raw(schema_ptr)
        }
    }

    /// Parse an XML document from an in-memory byte buffer.
    ///
    /// Entity resolution, DTD loading, and network access are disabled;
    /// oversized trees are allowed (`XML_PARSE_HUGE`). There is no
    /// recovery mode: malformed input is an error, never a partial tree.
    pub fn parse_document(&self, data: &[u8]) -> LibXml2Result<XmlDocPtr> {
        let options = XML_PARSE_NONET | XML_PARSE_HUGE | XML_PARSE_NOERROR | XML_PARSE_NOWARNING;

        unsafe {
            xmlResetLastError();
            let doc = xmlReadMemory(
                data.as_ptr() as *const c_char,
                data.len() as c_int,
                std::ptr::null(),
                std::ptr::null(),
                options,
            );

            if doc.is_null() {
                let details =
                    last_error_message().unwrap_or_else(|| "malformed XML document".to_string());
                return Err(LibXml2Error::DocumentParseFailed { details });
            }

            Ok(XmlDocPtr {
                inner: Arc::new(XmlDocInner { ptr: doc }),
            })
        }
    }

    /// Validate a parsed document against a compiled schema.
    ///
    /// Thread-safe: each call creates its own validation context; the
    /// schema pointer is shared read-only.
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        doc: &XmlDocPtr,
    ) -> LibXml2Result<ValidationResult> {
        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut errors = Vec::new();
            let errors_ptr = &mut errors as *mut Vec<String> as *mut c_void;

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, doc.as_ptr());

            xmlSchemaFreeValidCtxt(valid_ctxt);

            Ok(ValidationResult::from_code(result_code, errors))
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
