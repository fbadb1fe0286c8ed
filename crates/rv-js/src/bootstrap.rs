//! Window-level environment evaluated before the DOM shim: globals, console
//! capture, virtual timers and the mocked network layer.

use crate::JsHostEnvironment;

pub(crate) const BOOTSTRAP_ENV: &str = r#"
globalThis.window = globalThis;
globalThis.self = globalThis;
globalThis.global = globalThis;
globalThis.parent = globalThis;
globalThis.top = globalThis;
globalThis.frameElement = null;

globalThis.__pv_console = [];
globalThis.__pv_console_limit = 500;
globalThis.__pv_format_value = function (value) {
  if (typeof value === "string") {
    return value;
  }
  if (value instanceof Error) {
    return value.name + ": " + value.message;
  }
  if (value !== null && typeof value === "object") {
    try {
      return JSON.stringify(value);
    } catch (_) {
      return String(value);
    }
  }
  return String(value);
};
globalThis.__pv_console_push = function (level, text) {
  if (globalThis.__pv_console.length < globalThis.__pv_console_limit) {
    globalThis.__pv_console.push({ level: level, text: String(text) });
  }
};
globalThis.__pv_report_error = function (error) {
  globalThis.__pv_console_push("error", "Uncaught " + globalThis.__pv_format_value(error));
};
(function () {
  function recorder(level) {
    return function () {
      var parts = [];
      for (var i = 0; i < arguments.length; i += 1) {
        parts.push(globalThis.__pv_format_value(arguments[i]));
      }
      globalThis.__pv_console_push(level, parts.join(" "));
    };
  }
  function noop() {}
  globalThis.console = {
    log: recorder("log"),
    info: recorder("info"),
    debug: recorder("debug"),
    trace: recorder("debug"),
    table: recorder("log"),
    dir: recorder("log"),
    warn: recorder("warn"),
    error: recorder("error"),
    assert: function (condition) {
      if (!condition) {
        var rest = Array.prototype.slice.call(arguments, 1);
        globalThis.__pv_console_push("error", ["Assertion failed:"].concat(rest.map(globalThis.__pv_format_value)).join(" "));
      }
    },
    group: noop,
    groupCollapsed: noop,
    groupEnd: noop,
    time: noop,
    timeEnd: noop,
    count: noop,
    clear: noop
  };
})();

globalThis.__pv_clock = { now: 0, seq: 0 };
globalThis.performance = {
  now: function () { return globalThis.__pv_clock.now; },
  timeOrigin: 0,
  mark: function () {},
  measure: function () {},
  getEntriesByType: function () { return []; },
  getEntriesByName: function () { return []; }
};

globalThis.__pv_timer_queue = [];
globalThis.__pv_next_timer_id = 1;
(function () {
  function schedule(callback, delay, args, repeat) {
    var cb = callback;
    if (typeof cb !== "function") {
      var src = String(callback);
      cb = function () { (0, eval)(src); };
    }
    var ms = Number(delay);
    if (!(ms > 0)) {
      ms = 0;
    }
    var id = globalThis.__pv_next_timer_id++;
    globalThis.__pv_timer_queue.push({
      id: id,
      due: globalThis.__pv_clock.now + ms,
      seq: globalThis.__pv_clock.seq++,
      cb: cb,
      args: args,
      interval: repeat ? Math.max(ms, 1) : 0
    });
    return id;
  }
  function cancel(id) {
    var key = Number(id);
    globalThis.__pv_timer_queue = globalThis.__pv_timer_queue.filter(function (task) {
      return task.id !== key;
    });
  }
  globalThis.setTimeout = function (callback, delay) {
    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), false);
  };
  globalThis.setInterval = function (callback, delay) {
    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), true);
  };
  globalThis.clearTimeout = cancel;
  globalThis.clearInterval = cancel;
  globalThis.requestAnimationFrame = function (callback) {
    return schedule(function () {
      if (typeof callback === "function") {
        callback(globalThis.performance.now());
      }
    }, 16, [], false);
  };
  globalThis.cancelAnimationFrame = cancel;
  globalThis.requestIdleCallback = function (callback) {
    return schedule(function () {
      if (typeof callback === "function") {
        callback({ didTimeout: false, timeRemaining: function () { return 0; } });
      }
    }, 1, [], false);
  };
  globalThis.cancelIdleCallback = cancel;
  globalThis.queueMicrotask = function (callback) {
    Promise.resolve().then(function () {
      try {
        callback();
      } catch (error) {
        globalThis.__pv_report_error(error);
      }
    });
  };

  function earliest(now) {
    var best = -1;
    for (var i = 0; i < globalThis.__pv_timer_queue.length; i += 1) {
      var task = globalThis.__pv_timer_queue[i];
      if (task.due > now) {
        continue;
      }
      if (best < 0) {
        best = i;
        continue;
      }
      var current = globalThis.__pv_timer_queue[best];
      if (task.due < current.due || (task.due === current.due && task.seq < current.seq)) {
        best = i;
      }
    }
    return best;
  }

  globalThis.__pv_next_timer_due = function () {
    var index = earliest(Infinity);
    return index < 0 ? -1 : globalThis.__pv_timer_queue[index].due;
  };

  // Runs at most `limit` due timers, in due-time order, advancing virtual time.
  globalThis.__pv_run_due_timers = function (now, limit) {
    var runs = 0;
    var maxRuns = Number(limit) || 1;
    while (runs < maxRuns) {
      var index = earliest(now);
      if (index < 0) {
        break;
      }
      var task = globalThis.__pv_timer_queue.splice(index, 1)[0];
      globalThis.__pv_clock.now = Math.max(globalThis.__pv_clock.now, task.due);
      if (task.interval > 0) {
        globalThis.__pv_timer_queue.push({
          id: task.id,
          due: task.due + task.interval,
          seq: globalThis.__pv_clock.seq++,
          cb: task.cb,
          args: task.args,
          interval: task.interval
        });
      }
      try {
        task.cb.apply(globalThis, task.args || []);
      } catch (error) {
        globalThis.__pv_report_error(error);
      }
      runs += 1;
    }
    return runs;
  };

  globalThis.__pv_advance_clock = function (now) {
    globalThis.__pv_clock.now = Math.max(globalThis.__pv_clock.now, Number(now) || 0);
  };
})();

globalThis.matchMedia = function (query) {
  return {
    media: String(query || ""),
    matches: false,
    onchange: null,
    addListener: function () {},
    removeListener: function () {},
    addEventListener: function () {},
    removeEventListener: function () {},
    dispatchEvent: function () { return true; }
  };
};

globalThis.atob = function (input) {
  var chars = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
  var str = String(input).replace(/[\t\n\f\r ]+/g, "");
  if (str.length % 4 === 0) {
    str = str.replace(/==?$/, "");
  }
  if (str.length % 4 === 1 || /[^+/0-9A-Za-z]/.test(str)) {
    throw new Error("InvalidCharacterError: The string to be decoded is not correctly encoded.");
  }
  var out = "";
  var buffer = 0;
  var bits = 0;
  for (var i = 0; i < str.length; i += 1) {
    buffer = (buffer << 6) | chars.indexOf(str.charAt(i));
    bits += 6;
    if (bits >= 8) {
      bits -= 8;
      out += String.fromCharCode((buffer >> bits) & 0xff);
    }
  }
  return out;
};
globalThis.btoa = function (input) {
  var chars = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
  var str = String(input);
  var out = "";
  for (var i = 0; i < str.length; i += 3) {
    var a = str.charCodeAt(i);
    var b = str.charCodeAt(i + 1);
    var c = str.charCodeAt(i + 2);
    if (a > 0xff || b > 0xff || c > 0xff) {
      throw new Error("InvalidCharacterError: The string to be encoded contains characters outside of the Latin1 range.");
    }
    var triple = (a << 16) | ((b || 0) << 8) | (c || 0);
    out += chars.charAt((triple >> 18) & 63) + chars.charAt((triple >> 12) & 63);
    out += i + 1 < str.length ? chars.charAt((triple >> 6) & 63) : "=";
    out += i + 2 < str.length ? chars.charAt(triple & 63) : "=";
  }
  return out;
};

(function () {
  function MemoryStorage() {
    Object.defineProperty(this, "__items", { value: Object.create(null), enumerable: false });
  }
  MemoryStorage.prototype.getItem = function (key) {
    var k = String(key);
    return Object.prototype.hasOwnProperty.call(this.__items, k) ? this.__items[k] : null;
  };
  MemoryStorage.prototype.setItem = function (key, value) { this.__items[String(key)] = String(value); };
  MemoryStorage.prototype.removeItem = function (key) { delete this.__items[String(key)]; };
  MemoryStorage.prototype.clear = function () {
    var keys = Object.keys(this.__items);
    for (var i = 0; i < keys.length; i += 1) {
      delete this.__items[keys[i]];
    }
  };
  MemoryStorage.prototype.key = function (index) {
    var keys = Object.keys(this.__items);
    return index >= 0 && index < keys.length ? keys[index] : null;
  };
  Object.defineProperty(MemoryStorage.prototype, "length", {
    get: function () { return Object.keys(this.__items).length; }
  });
  globalThis.Storage = MemoryStorage;
  globalThis.localStorage = new MemoryStorage();
  globalThis.sessionStorage = new MemoryStorage();
})();

// Network layer. Requests are logged and never answered.
globalThis.__pv_network_log = [];
(function () {
  function logRequest(api, method, url) {
    globalThis.__pv_network_log.push({
      api: api,
      method: String(method || "GET").toUpperCase(),
      url: String(url == null ? "" : url)
    });
  }

  function Request(input, init) {
    if (!(this instanceof Request)) {
      throw new TypeError("Failed to construct 'Request': Please use the 'new' operator.");
    }
    var source = input instanceof Request ? input : null;
    this.url = source ? source.url : String(input);
    this.method = String((init && init.method) || (source ? source.method : "GET")).toUpperCase();
    this.headers = (init && init.headers) || (source ? source.headers : {});
  }
  function Response(body, init) {
    if (!(this instanceof Response)) {
      throw new TypeError("Failed to construct 'Response': Please use the 'new' operator.");
    }
    this.body = body == null ? null : body;
    this.status = (init && init.status) || 200;
    this.statusText = (init && init.statusText) || "";
    this.ok = this.status >= 200 && this.status < 300;
    this.headers = (init && init.headers) || {};
  }
  Response.prototype.text = function () {
    var body = this.body;
    return Promise.resolve(body == null ? "" : String(body));
  };
  Response.prototype.json = function () {
    var body = this.body;
    return Promise.resolve().then(function () { return JSON.parse(String(body)); });
  };
  globalThis.Request = Request;
  globalThis.Response = Response;
  globalThis.Headers = function Headers(init) {
    this.__map = Object.create(null);
    if (init && typeof init === "object") {
      var keys = Object.keys(init);
      for (var i = 0; i < keys.length; i += 1) {
        this.__map[keys[i].toLowerCase()] = String(init[keys[i]]);
      }
    }
  };
  globalThis.Headers.prototype.get = function (name) {
    var key = String(name).toLowerCase();
    return key in this.__map ? this.__map[key] : null;
  };
  globalThis.Headers.prototype.set = function (name, value) {
    this.__map[String(name).toLowerCase()] = String(value);
  };

  globalThis.fetch = function fetch(input, init) {
    var url = input instanceof Request ? input.url : input;
    var method = (init && init.method) || (input instanceof Request ? input.method : "GET");
    logRequest("fetch", method, url);
    return new Promise(function () {});
  };

  function XMLHttpRequest() {
    this.readyState = 0;
    this.status = 0;
    this.statusText = "";
    this.responseText = "";
    this.response = null;
    this.responseType = "";
    this.onreadystatechange = null;
    this.onload = null;
    this.onerror = null;
    this.__method = "GET";
    this.__url = "";
  }
  XMLHttpRequest.UNSENT = 0;
  XMLHttpRequest.OPENED = 1;
  XMLHttpRequest.HEADERS_RECEIVED = 2;
  XMLHttpRequest.LOADING = 3;
  XMLHttpRequest.DONE = 4;
  XMLHttpRequest.prototype.open = function (method, url) {
    this.__method = String(method || "GET");
    this.__url = String(url == null ? "" : url);
    this.readyState = 1;
  };
  XMLHttpRequest.prototype.setRequestHeader = function () {};
  XMLHttpRequest.prototype.overrideMimeType = function () {};
  XMLHttpRequest.prototype.getAllResponseHeaders = function () { return ""; };
  XMLHttpRequest.prototype.getResponseHeader = function () { return null; };
  XMLHttpRequest.prototype.abort = function () { this.readyState = 0; };
  XMLHttpRequest.prototype.addEventListener = function () {};
  XMLHttpRequest.prototype.removeEventListener = function () {};
  XMLHttpRequest.prototype.send = function () {
    logRequest("XMLHttpRequest", this.__method, this.__url);
  };
  globalThis.XMLHttpRequest = XMLHttpRequest;

  function WebSocket(url) {
    if (!(this instanceof WebSocket)) {
      throw new TypeError("Failed to construct 'WebSocket': Please use the 'new' operator.");
    }
    logRequest("WebSocket", "GET", url);
    this.url = String(url);
    this.readyState = 0;
    this.onopen = null;
    this.onmessage = null;
    this.onclose = null;
    this.onerror = null;
  }
  WebSocket.CONNECTING = 0;
  WebSocket.OPEN = 1;
  WebSocket.CLOSING = 2;
  WebSocket.CLOSED = 3;
  WebSocket.prototype.send = function () {};
  WebSocket.prototype.close = function () { this.readyState = 3; };
  WebSocket.prototype.addEventListener = function () {};
  WebSocket.prototype.removeEventListener = function () {};
  globalThis.WebSocket = WebSocket;

  globalThis.__pv_log_request = logRequest;
})();
"#;

/// Host-specific globals: navigator, screen and viewport metrics.
pub(crate) fn build_host_bootstrap(host: &JsHostEnvironment) -> String {
    let user_agent = js_string_literal(&host.user_agent);
    let page_url = js_string_literal(&host.page_url);
    let cookie_seed = js_string_literal(&host.cookie_header);
    let width = host.viewport_width;
    let height = host.viewport_height;

    format!(
        r#"
globalThis.__pv_page_url = {page_url};
globalThis.__pv_cookie_seed = {cookie_seed};
globalThis.navigator = {{
  userAgent: {user_agent},
  language: "en-US",
  languages: ["en-US", "en"],
  platform: "Win32",
  cookieEnabled: true,
  onLine: true,
  webdriver: false,
  sendBeacon: function (url) {{
    globalThis.__pv_log_request("navigator.sendBeacon", "POST", url);
    return true;
  }}
}};
globalThis.innerWidth = {width};
globalThis.innerHeight = {height};
globalThis.outerWidth = {width};
globalThis.outerHeight = {height};
globalThis.devicePixelRatio = 1;
globalThis.scrollX = 0;
globalThis.scrollY = 0;
globalThis.pageXOffset = 0;
globalThis.pageYOffset = 0;
globalThis.screen = {{
  width: {width},
  height: {height},
  availWidth: {width},
  availHeight: {height},
  colorDepth: 24,
  pixelDepth: 24
}};
globalThis.scrollTo = function () {{}};
globalThis.scrollBy = function () {{}};
globalThis.focus = function () {{}};
globalThis.blur = function () {{}};
globalThis.print = function () {{}};
"#
    )
}

/// JSON string literals are valid JS string literals.
pub(crate) fn js_string_literal(input: &str) -> String {
    serde_json::Value::String(input.to_owned()).to_string()
}
