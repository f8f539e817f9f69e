/*
Aliases for data types for readability and to allow resizing in future
*/

pub type PortNumber = u16; // Conforms to TCP/IP port numbering
pub type ConnectionId = u32; // Up to 4 billion connections over the lifetime of a server
pub type ClientCount = usize; // Number of clients connected at one instant
