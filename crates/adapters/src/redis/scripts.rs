// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lua scripts that mutate and publish the matching event atomically
//!
//! Values are JSON text, so events are assembled by concatenation.

use redis::Script;

const QUEUE_PUSH: &str = r#"
for i = 1, #ARGV do
  redis.call('RPUSH', KEYS[1], ARGV[i])
  redis.call('PUBLISH', KEYS[2], '{"kind":"added","item":' .. ARGV[i] .. '}')
end
return #ARGV
"#;

const QUEUE_INSERT_BEFORE: &str = r#"
local n = redis.call('LINSERT', KEYS[1], 'BEFORE', ARGV[1], ARGV[2])
if n > 0 then
  redis.call('PUBLISH', KEYS[2], '{"kind":"added","item":' .. ARGV[2] .. '}')
end
return n
"#;

const QUEUE_POLL: &str = r#"
local v = redis.call('LPOP', KEYS[1])
if v then
  redis.call('PUBLISH', KEYS[2], '{"kind":"removed","item":' .. v .. '}')
end
return v
"#;

const QUEUE_REMOVE: &str = r#"
local total = 0
for i = 1, #ARGV do
  local n = redis.call('LREM', KEYS[1], 0, ARGV[i])
  for _ = 1, n do
    redis.call('PUBLISH', KEYS[2], '{"kind":"removed","item":' .. ARGV[i] .. '}')
  end
  total = total + n
end
return total
"#;

const QUEUE_CLEAR: &str = r#"
local items = redis.call('LRANGE', KEYS[1], 0, -1)
redis.call('DEL', KEYS[1])
for _, v in ipairs(items) do
  redis.call('PUBLISH', KEYS[2], '{"kind":"removed","item":' .. v .. '}')
end
return #items
"#;

const MAP_PUT: &str = r#"
local old = redis.call('HGET', KEYS[1], ARGV[1])
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
if old then
  redis.call('PUBLISH', KEYS[2], '{"kind":"updated","key":' .. ARGV[1] .. ',"value":' .. ARGV[2] .. ',"old":' .. old .. '}')
else
  redis.call('PUBLISH', KEYS[2], '{"kind":"added","key":' .. ARGV[1] .. ',"value":' .. ARGV[2] .. '}')
end
return old
"#;

const MAP_REMOVE: &str = r#"
local old = redis.call('HGET', KEYS[1], ARGV[1])
if old then
  redis.call('HDEL', KEYS[1], ARGV[1])
  redis.call('PUBLISH', KEYS[2], '{"kind":"removed","key":' .. ARGV[1] .. ',"old":' .. old .. '}')
end
return old
"#;

const MAP_CLEAR: &str = r#"
local entries = redis.call('HGETALL', KEYS[1])
redis.call('DEL', KEYS[1])
for i = 1, #entries, 2 do
  redis.call('PUBLISH', KEYS[2], '{"kind":"removed","key":' .. entries[i] .. ',"old":' .. entries[i + 1] .. '}')
end
return #entries / 2
"#;

const SET_ADD: &str = r#"
local added = 0
for i = 1, #ARGV do
  if redis.call('SADD', KEYS[1], ARGV[i]) == 1 then
    redis.call('PUBLISH', KEYS[2], '{"kind":"added","item":' .. ARGV[i] .. '}')
    added = added + 1
  end
end
return added
"#;

const SET_REMOVE: &str = r#"
local removed = 0
for i = 1, #ARGV do
  if redis.call('SREM', KEYS[1], ARGV[i]) == 1 then
    redis.call('PUBLISH', KEYS[2], '{"kind":"removed","item":' .. ARGV[i] .. '}')
    removed = removed + 1
  end
end
return removed
"#;

const SET_CLEAR: &str = r#"
local members = redis.call('SMEMBERS', KEYS[1])
redis.call('DEL', KEYS[1])
for _, v in ipairs(members) do
  redis.call('PUBLISH', KEYS[2], '{"kind":"removed","item":' .. v .. '}')
end
return #members
"#;

/// Acquire or re-enter; the key's TTL is the lease
const LOCK: &str = r#"
local owner = redis.call('HGET', KEYS[1], 'owner')
if not owner then
  redis.call('HSET', KEYS[1], 'owner', ARGV[1], 'count', 1)
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
  return 1
end
if owner == ARGV[1] then
  redis.call('HINCRBY', KEYS[1], 'count', 1)
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
  return 1
end
return 0
"#;

const UNLOCK: &str = r#"
local owner = redis.call('HGET', KEYS[1], 'owner')
if owner ~= ARGV[1] then
  return -1
end
local count = redis.call('HINCRBY', KEYS[1], 'count', -1)
if count <= 0 then
  redis.call('DEL', KEYS[1])
end
return count
"#;

/// Record a name's element type, returning the type it already had
const CLAIM_TYPE: &str = r#"
redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2])
return redis.call('HGET', KEYS[1], ARGV[1])
"#;

pub(crate) struct Scripts {
    pub queue_push: Script,
    pub queue_insert_before: Script,
    pub queue_poll: Script,
    pub queue_remove: Script,
    pub queue_clear: Script,
    pub map_put: Script,
    pub map_remove: Script,
    pub map_clear: Script,
    pub set_add: Script,
    pub set_remove: Script,
    pub set_clear: Script,
    pub lock: Script,
    pub unlock: Script,
    pub claim_type: Script,
}

impl Scripts {
    pub fn load() -> Self {
        Self {
            queue_push: Script::new(QUEUE_PUSH),
            queue_insert_before: Script::new(QUEUE_INSERT_BEFORE),
            queue_poll: Script::new(QUEUE_POLL),
            queue_remove: Script::new(QUEUE_REMOVE),
            queue_clear: Script::new(QUEUE_CLEAR),
            map_put: Script::new(MAP_PUT),
            map_remove: Script::new(MAP_REMOVE),
            map_clear: Script::new(MAP_CLEAR),
            set_add: Script::new(SET_ADD),
            set_remove: Script::new(SET_REMOVE),
            set_clear: Script::new(SET_CLEAR),
            lock: Script::new(LOCK),
            unlock: Script::new(UNLOCK),
            claim_type: Script::new(CLAIM_TYPE),
        }
    }
}
