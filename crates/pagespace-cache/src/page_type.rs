//! The fixed page type enumeration (spec.md §3), shared by both caches.

/// The eight page types a drive's tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// A container node with no content of its own.
    Folder,
    /// A rich-text document.
    Document,
    /// A tabular spreadsheet.
    Sheet,
    /// A freeform visual canvas.
    Canvas,
    /// A checklist of tasks.
    TaskList,
    /// A persisted AI conversation.
    AiChat,
    /// A team channel.
    Channel,
    /// An uploaded file.
    File,
}
