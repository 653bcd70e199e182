//! Full protobuf names of the handler payload types, shared by the
//! handlers and their clients when packing `Any` envelopes.

pub const REGISTERUSER_REQUEST: &str = "corvid.caw.RegisteruserRequest";
pub const REGISTERUSER_REPLY: &str = "corvid.caw.RegisteruserReply";
pub const FOLLOW_REQUEST: &str = "corvid.caw.FollowRequest";
pub const FOLLOW_REPLY: &str = "corvid.caw.FollowReply";
pub const PROFILE_REQUEST: &str = "corvid.caw.ProfileRequest";
pub const PROFILE_REPLY: &str = "corvid.caw.ProfileReply";
pub const CAW_REQUEST: &str = "corvid.caw.CawRequest";
pub const CAW_REPLY: &str = "corvid.caw.CawReply";
pub const READ_REQUEST: &str = "corvid.caw.ReadRequest";
pub const READ_REPLY: &str = "corvid.caw.ReadReply";
pub const STREAM_REQUEST: &str = "corvid.caw.StreamRequest";
pub const STREAM_REPLY: &str = "corvid.caw.StreamReply";
